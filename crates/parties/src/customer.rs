use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use billbook_core::{CustomerId, DomainError, DomainResult, Entity};

const MAX_NAME_LEN: usize = 100;
const MAX_PHONE_DIGITS: usize = 16;

/// Postal address. Every field is required.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub country: String,
}

/// Mutable customer details, as supplied on register/update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerDetails {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: Address,
}

impl CustomerDetails {
    /// Trim and normalise the details, rejecting anything malformed.
    fn normalized(self) -> DomainResult<Self> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(DomainError::invalid("customer name is required"));
        }
        if name.chars().count() > MAX_NAME_LEN {
            return Err(DomainError::invalid(
                "customer name cannot exceed 100 characters",
            ));
        }

        let email = self.email.trim().to_lowercase();
        if !is_valid_email(&email) {
            return Err(DomainError::invalid("please provide a valid email"));
        }

        let phone = self.phone.trim().to_string();
        if !is_valid_phone(&phone) {
            return Err(DomainError::invalid("please provide a valid phone number"));
        }

        let address = Address {
            street: required(self.address.street, "street address")?,
            city: required(self.address.city, "city")?,
            state: required(self.address.state, "state")?,
            zip_code: required(self.address.zip_code, "zip code")?,
            country: required(self.address.country, "country")?,
        };

        Ok(Self {
            name,
            email,
            phone,
            address,
        })
    }
}

fn required(value: String, field: &str) -> DomainResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DomainError::invalid(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

fn is_valid_email(email: &str) -> bool {
    let mut parts = email.split('@');
    let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
        return false;
    };
    !local.is_empty()
        && !email.contains(char::is_whitespace)
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

/// Optional leading `+`, then a non-zero digit followed by up to 15 digits.
fn is_valid_phone(phone: &str) -> bool {
    let digits = phone.strip_prefix('+').unwrap_or(phone);
    let mut chars = digits.chars();
    match chars.next() {
        Some(first) if ('1'..='9').contains(&first) => {}
        _ => return false,
    }
    digits.len() <= MAX_PHONE_DIGITS && chars.all(|c| c.is_ascii_digit())
}

/// A customer documents can be issued to.
///
/// Customers are never removed: deactivation hides them from new documents
/// while existing documents keep their reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    id: CustomerId,
    details: CustomerDetails,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl Customer {
    pub fn register(
        id: CustomerId,
        details: CustomerDetails,
        created_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        Ok(Self {
            id,
            details: details.normalized()?,
            is_active: true,
            created_at,
        })
    }

    pub fn id_typed(&self) -> CustomerId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.details.name
    }

    pub fn email(&self) -> &str {
        &self.details.email
    }

    pub fn phone(&self) -> &str {
        &self.details.phone
    }

    pub fn address(&self) -> &Address {
        &self.details.address
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Invariant helper: only active customers may appear on new documents.
    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn update_details(&mut self, details: CustomerDetails) -> DomainResult<()> {
        self.ensure_active()?;
        self.details = details.normalized()?;
        Ok(())
    }

    pub fn deactivate(&mut self) -> DomainResult<()> {
        self.ensure_active()?;
        self.is_active = false;
        Ok(())
    }

    fn ensure_active(&self) -> DomainResult<()> {
        if !self.is_active {
            return Err(DomainError::CustomerNotFound);
        }
        Ok(())
    }
}

impl Entity for Customer {
    type Id = CustomerId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn details() -> CustomerDetails {
        CustomerDetails {
            name: "  Acme Supplies  ".to_string(),
            email: "Billing@Acme.Example".to_string(),
            phone: "+15551234567".to_string(),
            address: Address {
                street: "1 Main St".to_string(),
                city: "Springfield".to_string(),
                state: "IL".to_string(),
                zip_code: "62701".to_string(),
                country: "USA".to_string(),
            },
        }
    }

    #[test]
    fn register_normalizes_name_and_email() {
        let customer = Customer::register(CustomerId::new(), details(), Utc::now()).unwrap();
        assert_eq!(customer.name(), "Acme Supplies");
        assert_eq!(customer.email(), "billing@acme.example");
        assert!(customer.is_active());
    }

    #[test]
    fn register_rejects_empty_name() {
        let mut d = details();
        d.name = "   ".to_string();
        let err = Customer::register(CustomerId::new(), d, Utc::now()).unwrap_err();
        assert_eq!(err, DomainError::invalid("customer name is required"));
    }

    #[test]
    fn register_rejects_long_name() {
        let mut d = details();
        d.name = "x".repeat(101);
        assert!(Customer::register(CustomerId::new(), d, Utc::now()).is_err());
    }

    #[test]
    fn register_rejects_malformed_email() {
        for email in ["no-at-sign", "a@b", "@acme.com", "a@@acme.com", "a b@acme.com"] {
            let mut d = details();
            d.email = email.to_string();
            assert!(
                Customer::register(CustomerId::new(), d, Utc::now()).is_err(),
                "accepted {email}"
            );
        }
    }

    #[test]
    fn register_rejects_missing_address_field() {
        let mut d = details();
        d.address.zip_code = String::new();
        let err = Customer::register(CustomerId::new(), d, Utc::now()).unwrap_err();
        assert_eq!(err, DomainError::invalid("zip code is required"));
    }

    #[test]
    fn phone_rules() {
        assert!(is_valid_phone("5551234"));
        assert!(is_valid_phone("+15551234567"));
        assert!(!is_valid_phone("0555"));
        assert!(!is_valid_phone("+"));
        assert!(!is_valid_phone("555-1234"));
        assert!(!is_valid_phone("12345678901234567"));
    }

    #[test]
    fn deactivated_customer_cannot_be_updated() {
        let mut customer = Customer::register(CustomerId::new(), details(), Utc::now()).unwrap();
        customer.deactivate().unwrap();
        assert!(!customer.is_active());
        assert_eq!(
            customer.update_details(details()),
            Err(DomainError::CustomerNotFound)
        );
        assert_eq!(customer.deactivate(), Err(DomainError::CustomerNotFound));
    }

    #[test]
    fn address_serializes_camel_case() {
        let json = serde_json::to_value(&details().address).unwrap();
        assert_eq!(json["zipCode"], "62701");
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: any digit string with a non-zero lead and at most 16 digits is a phone.
            #[test]
            fn well_formed_phones_accepted(lead in 1u8..=9, rest in "[0-9]{0,15}", plus in any::<bool>()) {
                let phone = format!("{}{}{}", if plus { "+" } else { "" }, lead, rest);
                prop_assert!(is_valid_phone(&phone));
            }
        }
    }
}
