use crate::{
    error::{AppError, AppResult},
    models::Offer,
    payments::notification::ShippingDetails,
};

/// Shipping fields extracted from a checkout notification, normalized for
/// storage (city upper-cased, country lower-cased).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShippingFields {
    pub name: String,
    pub city: String,
    pub country: String,
    pub address_1: String,
    pub address_2: String,
    pub zip_code: String,
}

fn required(value: Option<&String>, field: &'static str) -> AppResult<String> {
    value
        .cloned()
        .ok_or(AppError::MissingRequiredField(field))
}

pub fn validate_shipping(details: Option<&ShippingDetails>) -> AppResult<ShippingFields> {
    let details = details.ok_or(AppError::MissingRequiredField("shipping_details"))?;
    let address = details
        .address
        .as_ref()
        .ok_or(AppError::MissingRequiredField("shipping_details.address"))?;

    Ok(ShippingFields {
        name: required(details.name.as_ref(), "name")?,
        city: required(address.city.as_ref(), "city")?.to_uppercase(),
        country: required(address.country.as_ref(), "country")?.to_lowercase(),
        address_1: required(address.line1.as_ref(), "line1")?,
        address_2: address.line2.clone().unwrap_or_default(),
        zip_code: required(address.postal_code.as_ref(), "postal_code")?,
    })
}

pub fn validate_offer(quantity: i32) -> AppResult<Offer> {
    Offer::from_seats(quantity).ok_or_else(|| AppError::InvalidValue {
        field: "offer",
        reason: format!("{quantity} is not one of 1, 2 or 4"),
    })
}

pub fn validate_event_name(name: &str) -> AppResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::InvalidValue {
            field: "name",
            reason: "must not be empty".into(),
        });
    }
    if name.chars().count() > 128 {
        return Err(AppError::InvalidValue {
            field: "name",
            reason: "must be at most 128 characters".into(),
        });
    }
    Ok(name.to_string())
}

/// Lower-case ASCII slug: runs of anything else collapse to one `-`.
pub fn slugify(value: &str) -> String {
    let mut slug = String::with_capacity(value.len());
    for c in value.chars() {
        let c = fold_accent(c);
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').to_string()
}

fn fold_accent(c: char) -> char {
    match c {
        'à' | 'á' | 'â' | 'ä' | 'À' | 'Â' | 'Ä' => 'a',
        'ç' | 'Ç' => 'c',
        'é' | 'è' | 'ê' | 'ë' | 'É' | 'È' | 'Ê' | 'Ë' => 'e',
        'î' | 'ï' | 'Î' | 'Ï' => 'i',
        'ô' | 'ö' | 'Ô' | 'Ö' => 'o',
        'ù' | 'û' | 'ü' | 'Ù' | 'Û' | 'Ü' => 'u',
        other => other,
    }
}
