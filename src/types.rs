//! Domain types returned by the Gravatar API.

use std::fmt;

use crate::xmlrpc::encoding::Value;

/// Content classification of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rating {
    G,
    PG,
    R,
    X,
}

impl Rating {
    /// The wire integer for this rating.
    pub fn code(self) -> i32 {
        match self {
            Rating::G => 0,
            Rating::PG => 1,
            Rating::R => 2,
            Rating::X => 3,
        }
    }

    /// Decodes a wire integer. Unrecognized codes decode as [`Rating::X`],
    /// matching the service's historical behavior.
    pub fn from_code(code: i32) -> Rating {
        match code {
            0 => Rating::G,
            1 => Rating::PG,
            2 => Rating::R,
            _ => Rating::X,
        }
    }

    /// Decodes a rating from a reply value. Listing replies carry the code
    /// either as an integer or as a numeric string.
    pub(crate) fn from_value(value: &Value) -> Option<Rating> {
        match value {
            Value::Int(code) => Some(Rating::from_code(*code)),
            Value::String(text) => Some(match text.trim() {
                "0" => Rating::G,
                "1" => Rating::PG,
                "2" => Rating::R,
                _ => Rating::X,
            }),
            _ => None,
        }
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Rating::G => "G",
            Rating::PG => "PG",
            Rating::R => "R",
            Rating::X => "X",
        })
    }
}

/// An image stored on the account.
///
/// `url` is only known after a listing call; an upload returns just the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserImage {
    pub id: String,
    pub rating: Rating,
    pub url: Option<String>,
}

impl UserImage {
    /// Decodes one `grav.userimages` entry, a 2-element `[rating, url]`
    /// array keyed by image id.
    pub(crate) fn from_entry(id: &str, value: &Value) -> Option<UserImage> {
        let entry = value.as_array()?;
        let rating = Rating::from_value(entry.first()?)?;
        let url = entry.get(1).and_then(Value::as_str)?.to_string();
        Some(UserImage {
            id: id.to_string(),
            rating,
            url: Some(url),
        })
    }
}

/// One email address on the account and its currently active image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    pub rating: Rating,
    pub image_id: String,
    pub image_url: String,
}

impl Address {
    /// Decodes one `grav.addresses` record. The image fields may be absent
    /// for an address with no active image; they decode as empty strings.
    pub(crate) fn from_value(value: &Value) -> Option<Address> {
        let members = value.as_struct()?;
        let rating = Rating::from_value(members.get("rating")?)?;
        let image_id = members
            .get("userimage")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string();
        let image_url = members
            .get("userimage_url")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string();
        Some(Address {
            rating,
            image_id,
            image_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xmlrpc::encoding::Struct;

    #[test]
    fn rating_codes_roundtrip() {
        for rating in [Rating::G, Rating::PG, Rating::R, Rating::X] {
            assert_eq!(Rating::from_code(rating.code()), rating);
        }
    }

    #[test]
    fn unknown_rating_codes_fall_back_to_x() {
        assert_eq!(Rating::from_code(4), Rating::X);
        assert_eq!(Rating::from_code(-1), Rating::X);
        assert_eq!(Rating::from_value(&Value::from("17")), Some(Rating::X));
        assert_eq!(Rating::from_value(&Value::from("garbage")), Some(Rating::X));
    }

    #[test]
    fn rating_decodes_from_int_and_string() {
        assert_eq!(Rating::from_value(&Value::Int(1)), Some(Rating::PG));
        assert_eq!(Rating::from_value(&Value::from("2")), Some(Rating::R));
        assert_eq!(Rating::from_value(&Value::Bool(true)), None);
    }

    #[test]
    fn user_image_decodes_listing_entry() {
        let entry = Value::Array(vec![
            Value::Int(2),
            Value::from("https://secure.gravatar.com/userimage/1/abc.jpg"),
        ]);
        let image = UserImage::from_entry("abc", &entry).unwrap();
        assert_eq!(image.id, "abc");
        assert_eq!(image.rating, Rating::R);
        assert_eq!(
            image.url.as_deref(),
            Some("https://secure.gravatar.com/userimage/1/abc.jpg")
        );
    }

    #[test]
    fn user_image_rejects_short_entry() {
        let entry = Value::Array(vec![Value::Int(0)]);
        assert!(UserImage::from_entry("abc", &entry).is_none());
    }

    #[test]
    fn address_decodes_record() {
        let mut members = Struct::new();
        members.insert("rating".to_string(), Value::Int(0));
        members.insert("userimage".to_string(), Value::from("abc"));
        members.insert(
            "userimage_url".to_string(),
            Value::from("https://secure.gravatar.com/userimage/1/abc.jpg"),
        );
        let address = Address::from_value(&Value::Struct(members)).unwrap();
        assert_eq!(address.rating, Rating::G);
        assert_eq!(address.image_id, "abc");
        assert_eq!(
            address.image_url,
            "https://secure.gravatar.com/userimage/1/abc.jpg"
        );
    }

    #[test]
    fn address_tolerates_missing_image_fields() {
        let mut members = Struct::new();
        members.insert("rating".to_string(), Value::Int(1));
        let address = Address::from_value(&Value::Struct(members)).unwrap();
        assert_eq!(address.rating, Rating::PG);
        assert!(address.image_id.is_empty());
        assert!(address.image_url.is_empty());
    }

    #[test]
    fn address_requires_a_rating() {
        assert!(Address::from_value(&Value::Struct(Struct::new())).is_none());
        assert!(Address::from_value(&Value::from("not a struct")).is_none());
    }
}
