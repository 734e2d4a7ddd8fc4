//! The multi-step "list an item" flow: draft state and step gating.

use crate::error::Error;
use crate::models::ItemKind;

/// Default cap on rental length, in days.
pub const DEFAULT_MAX_RENTAL_DAYS: i32 = 30;

/// An attached photo, not yet uploaded.
#[derive(Debug, Clone)]
pub struct PhotoAttachment {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Draft of a new listing, filled in across the three steps of the flow
/// (photo, details, disposition).
#[derive(Debug, Clone)]
pub struct ListingDraft {
    pub title: String,
    pub description: String,
    pub price: Option<f64>,
    pub kind: ItemKind,
    pub category: String,
    pub photo: Option<PhotoAttachment>,
    pub rental_price_per_day: Option<f64>,
    pub max_rental_days: Option<i32>,
}

impl Default for ListingDraft {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            price: None,
            kind: ItemKind::Sell,
            category: "Other".to_string(),
            photo: None,
            rental_price_per_day: None,
            max_rental_days: Some(DEFAULT_MAX_RENTAL_DAYS),
        }
    }
}

impl ListingDraft {
    /// Step gating: step 1 requires a photo, step 2 a non-blank title. Later
    /// steps are always allowed to advance.
    pub fn can_advance(&self, step: u8) -> bool {
        match step {
            1 => self.photo.is_some(),
            2 => !self.title.trim().is_empty(),
            _ => true,
        }
    }

    /// Validate the draft for submission. Mirrors the step gates so a draft
    /// built outside the flow cannot bypass them.
    pub fn validate(&self) -> Result<(), Error> {
        if self.photo.is_none() {
            return Err(Error::InvalidListing("a photo is required".to_string()));
        }
        if self.title.trim().is_empty() {
            return Err(Error::InvalidListing("a title is required".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn photo() -> PhotoAttachment {
        PhotoAttachment {
            file_name: "photo.jpg".into(),
            bytes: vec![0xff, 0xd8],
        }
    }

    #[test]
    fn step_one_requires_a_photo() {
        let mut draft = ListingDraft::default();
        assert!(!draft.can_advance(1));
        draft.photo = Some(photo());
        assert!(draft.can_advance(1));
    }

    #[test]
    fn step_two_requires_a_title() {
        let mut draft = ListingDraft {
            photo: Some(photo()),
            ..Default::default()
        };
        assert!(!draft.can_advance(2));
        draft.title = "   ".to_string();
        assert!(!draft.can_advance(2));
        draft.title = "Desk lamp".to_string();
        assert!(draft.can_advance(2));
    }

    #[test]
    fn validation_mirrors_the_gates() {
        let mut draft = ListingDraft::default();
        assert!(matches!(draft.validate(), Err(Error::InvalidListing(_))));
        draft.photo = Some(photo());
        assert!(matches!(draft.validate(), Err(Error::InvalidListing(_))));
        draft.title = "Desk lamp".to_string();
        assert!(draft.validate().is_ok());
    }
}
