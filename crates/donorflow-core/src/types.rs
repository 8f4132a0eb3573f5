// crates/donorflow-core/src/types.rs

use std::error::Error as StdError;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{
    decode::Decode,
    encode::{Encode, IsNull},
    postgres::{PgArgumentBuffer, PgTypeInfo, PgValueRef},
    types::Type,
    Postgres,
};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentMethod {
    #[serde(rename = "Credit Card")]
    CreditCard,
    #[serde(rename = "Debit Card")]
    DebitCard,
    #[serde(rename = "Bank Transfer")]
    BankTransfer,
    Check,
    Cash,
    #[serde(rename = "UPI")]
    Upi,
    PayPal,
    Other,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 8] = [
        PaymentMethod::CreditCard,
        PaymentMethod::DebitCard,
        PaymentMethod::BankTransfer,
        PaymentMethod::Check,
        PaymentMethod::Cash,
        PaymentMethod::Upi,
        PaymentMethod::PayPal,
        PaymentMethod::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::CreditCard => "Credit Card",
            PaymentMethod::DebitCard => "Debit Card",
            PaymentMethod::BankTransfer => "Bank Transfer",
            PaymentMethod::Check => "Check",
            PaymentMethod::Cash => "Cash",
            PaymentMethod::Upi => "UPI",
            PaymentMethod::PayPal => "PayPal",
            PaymentMethod::Other => "Other",
        }
    }

    /// Exact match on the display label, surrounding whitespace ignored.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::ALL.into_iter().find(|method| method.as_str() == value)
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DonorSource {
    #[default]
    #[serde(rename = "CSV Upload")]
    CsvUpload,
    #[serde(rename = "Manual Entry")]
    ManualEntry,
    #[serde(rename = "Website Form")]
    WebsiteForm,
    #[serde(rename = "Mobile App")]
    MobileApp,
}

impl DonorSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DonorSource::CsvUpload => "CSV Upload",
            DonorSource::ManualEntry => "Manual Entry",
            DonorSource::WebsiteForm => "Website Form",
            DonorSource::MobileApp => "Mobile App",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "CSV Upload" => Some(DonorSource::CsvUpload),
            "Manual Entry" => Some(DonorSource::ManualEntry),
            "Website Form" => Some(DonorSource::WebsiteForm),
            "Mobile App" => Some(DonorSource::MobileApp),
            _ => None,
        }
    }
}

impl fmt::Display for DonorSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

macro_rules! text_enum_sqlx {
    ($ty:ident, $label:literal) => {
        impl Type<Postgres> for $ty {
            fn type_info() -> PgTypeInfo {
                <String as Type<Postgres>>::type_info()
            }

            fn compatible(ty: &PgTypeInfo) -> bool {
                <String as Type<Postgres>>::compatible(ty)
            }
        }

        impl Encode<'_, Postgres> for $ty {
            fn encode_by_ref(
                &self,
                buf: &mut PgArgumentBuffer,
            ) -> Result<IsNull, Box<dyn StdError + Send + Sync + 'static>> {
                <&str as Encode<Postgres>>::encode(self.as_str(), buf)
            }
        }

        impl Decode<'_, Postgres> for $ty {
            fn decode(
                value: PgValueRef<'_>,
            ) -> Result<Self, Box<dyn StdError + Send + Sync + 'static>> {
                let s = <&str as Decode<Postgres>>::decode(value)?;
                $ty::parse(s).ok_or_else(|| format!("Invalid {} value: {}", $label, s).into())
            }
        }
    };
}

text_enum_sqlx!(PaymentMethod, "payment method");
text_enum_sqlx!(DonorSource, "donor source");

/// One validated CSV row (or manual entry) on its way into the upsert engine.
///
/// `payment_method` stays free-form here; the enumeration is enforced when the
/// donor is written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DonationIntent {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub donation_amount: f64,
    pub donation_date: NaiveDate,
    pub payment_method: String,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DonationEntry {
    pub amount: f64,
    pub date: NaiveDate,
    pub payment_method: PaymentMethod,
    pub notes: String,
}

/// Persistent donor aggregate, keyed by lowercase email.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Donor {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    /// Amount of the most recently applied donation.
    pub donation_amount: f64,
    pub donation_date: NaiveDate,
    pub payment_method: PaymentMethod,
    pub notes: String,
    pub total_donated: f64,
    pub donation_history: Vec<DonationEntry>,
    pub last_donated: NaiveDate,
    pub is_active: bool,
    pub source: DonorSource,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request body for manual creation and full replacement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDonor {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub donation_amount: f64,
    pub donation_date: NaiveDate,
    pub payment_method: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub source: Option<DonorSource>,
}

impl NewDonor {
    pub fn into_intent(self) -> DonationIntent {
        DonationIntent {
            full_name: self.full_name.trim().to_string(),
            email: self.email.trim().to_lowercase(),
            phone: self.phone.trim().to_string(),
            address: self.address.trim().to_string(),
            donation_amount: self.donation_amount,
            donation_date: self.donation_date,
            payment_method: self.payment_method.trim().to_string(),
            notes: self.notes.unwrap_or_default().trim().to_string(),
        }
    }
}

/// Partial update. Only contact and status fields are editable so the
/// aggregates stay consistent with the history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DonorPatch {
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
    pub is_active: Option<bool>,
}

impl DonorPatch {
    pub fn is_empty(&self) -> bool {
        self.full_name.is_none()
            && self.phone.is_none()
            && self.address.is_none()
            && self.notes.is_none()
            && self.is_active.is_none()
    }
}
