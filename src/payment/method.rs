//! Payment methods and the context layouts their proofs follow.
//!
//! Each provider witnesses a different response shape. A [`FieldLayout`]
//! maps the positional values of `extractedParameters` to the roles the
//! pipeline needs; a [`MethodLayout`] adds an optional identity proof for
//! providers whose payment receipts don't name the payee directly.

use crate::error::{Error, Result};
use crate::extract::{extract_all_from_context, ContextProfile};
use crate::payment::amount::{AmountSign, TimestampFormat};
use crate::types::B256;
use serde::{Deserialize, Serialize};

/// Meaning of one extracted parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldRole {
    /// Paid amount.
    Amount,
    /// Payment time.
    Timestamp,
    /// Payee identifier, hashed and compared with the deposit's payee details.
    Recipient,
    /// ISO currency code.
    Currency,
    /// Provider's unique payment id, the source of the nullifier.
    PaymentId,
    /// Payment state, compared with the layout's required status.
    Status,
    /// Value that must match between a payment proof and its identity proof.
    Link,
    /// Extracted but unused.
    Ignored,
}

/// Where the payment currency comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CurrencySource {
    /// Provider only settles in one currency.
    Fixed(String),
    /// Read from the [`FieldRole::Currency`] parameter.
    Extracted,
}

/// Where the linkage hash returned to the escrow comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkageSource {
    /// `contextMessage` of a profile-A context, as a uint256.
    ContextMessage,
    /// Trailing `intentHash` of a profile-B context.
    IntentHash,
    /// The claim identifier itself.
    ClaimIdentifier,
}

/// Layout of a payment proof's context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldLayout {
    /// Context profile.
    pub profile: ContextProfile,
    /// Role of each extracted parameter, in order.
    pub roles: Vec<FieldRole>,
    /// Amount sign convention.
    #[serde(default)]
    pub amount_sign: AmountSign,
    /// Timestamp encoding.
    #[serde(default)]
    pub timestamp_format: TimestampFormat,
    /// Currency source.
    pub currency: CurrencySource,
    /// Linkage hash source.
    pub linkage: LinkageSource,
    /// Value the [`FieldRole::Status`] parameter must equal.
    #[serde(default)]
    pub required_status: Option<String>,
}

/// Layout of an identity proof's context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityLayout {
    /// Context profile.
    pub profile: ContextProfile,
    /// Role of each extracted parameter, in order. Only [`FieldRole::Link`],
    /// [`FieldRole::Recipient`] and [`FieldRole::Ignored`] are meaningful.
    pub roles: Vec<FieldRole>,
}

/// Everything the pipeline needs to know about a payment method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodLayout {
    /// Method name; also the nullifier domain.
    pub name: String,
    /// Payment proof layout.
    pub payment: FieldLayout,
    /// Identity proof layout for dual-proof methods.
    #[serde(default)]
    pub identity: Option<IdentityLayout>,
}

/// Supported payment methods.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentMethod {
    /// Venmo: profile A, USD only.
    Venmo,
    /// Revolut: profile A, negative amounts, millisecond timestamps.
    Revolut,
    /// Zelle: profile B, USD only, date-only timestamps.
    Zelle,
    /// Monzo: profile B, payment proof linked to an identity proof.
    Monzo,
    /// Generic witnessed provider with a caller-supplied layout.
    Witness(MethodLayout),
}

impl PaymentMethod {
    /// Method name, also used as the nullifier domain.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Venmo => "venmo",
            Self::Revolut => "revolut",
            Self::Zelle => "zelle",
            Self::Monzo => "monzo",
            Self::Witness(layout) => &layout.name,
        }
    }

    /// Layout for this method.
    #[must_use]
    pub fn layout(&self) -> MethodLayout {
        use FieldRole::{Amount, Currency, Link, PaymentId, Recipient, Status, Timestamp};

        match self {
            Self::Venmo => MethodLayout {
                name: "venmo".to_string(),
                payment: FieldLayout {
                    profile: ContextProfile::ContextFirst,
                    // amount, date, paymentId, receiverId
                    roles: vec![Amount, Timestamp, PaymentId, Recipient],
                    amount_sign: AmountSign::Positive,
                    timestamp_format: TimestampFormat::IsoDateTime,
                    currency: CurrencySource::Fixed("USD".to_string()),
                    linkage: LinkageSource::ContextMessage,
                    required_status: None,
                },
                identity: None,
            },
            Self::Revolut => MethodLayout {
                name: "revolut".to_string(),
                payment: FieldLayout {
                    profile: ContextProfile::ContextFirst,
                    // amount, completedDate, currency, id, recipient, state
                    roles: vec![Amount, Timestamp, Currency, PaymentId, Recipient, Status],
                    amount_sign: AmountSign::Negative,
                    timestamp_format: TimestampFormat::UnixMillis,
                    currency: CurrencySource::Extracted,
                    linkage: LinkageSource::ContextMessage,
                    required_status: Some("COMPLETED".to_string()),
                },
                identity: None,
            },
            Self::Zelle => MethodLayout {
                name: "zelle".to_string(),
                payment: FieldLayout {
                    profile: ContextProfile::ParametersFirst,
                    // amount, date, paymentId, recipientEmail
                    roles: vec![Amount, Timestamp, PaymentId, Recipient],
                    amount_sign: AmountSign::Positive,
                    timestamp_format: TimestampFormat::IsoDate,
                    currency: CurrencySource::Fixed("USD".to_string()),
                    linkage: LinkageSource::IntentHash,
                    required_status: None,
                },
                identity: None,
            },
            Self::Monzo => MethodLayout {
                name: "monzo".to_string(),
                payment: FieldLayout {
                    profile: ContextProfile::ParametersFirst,
                    // amount, counterpartyUserId, created, currency, transactionId
                    roles: vec![Amount, Link, Timestamp, Currency, PaymentId],
                    amount_sign: AmountSign::Negative,
                    timestamp_format: TimestampFormat::IsoDateTime,
                    currency: CurrencySource::Extracted,
                    linkage: LinkageSource::IntentHash,
                    required_status: None,
                },
                identity: Some(IdentityLayout {
                    profile: ContextProfile::ParametersFirst,
                    // userId, username
                    roles: vec![Link, Recipient],
                }),
            },
            Self::Witness(layout) => layout.clone(),
        }
    }
}

impl MethodLayout {
    /// Check that the layout is usable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] describing the first inconsistency.
    pub fn validate(&self) -> Result<()> {
        let payment = &self.payment;
        let count =
            |roles: &[FieldRole], role: FieldRole| roles.iter().filter(|r| **r == role).count();

        if self.name.is_empty() {
            return Err(Error::Config("payment method name is empty".to_string()));
        }
        for role in [FieldRole::Amount, FieldRole::Timestamp, FieldRole::PaymentId] {
            if count(&payment.roles, role) != 1 {
                return Err(Error::Config(format!(
                    "{}: payment layout needs exactly one {role:?}",
                    self.name
                )));
            }
        }

        let currencies = count(&payment.roles, FieldRole::Currency);
        match (&payment.currency, currencies) {
            (CurrencySource::Fixed(code), 0) if !code.is_empty() => {}
            (CurrencySource::Extracted, 1) => {}
            _ => {
                return Err(Error::Config(format!(
                    "{}: currency source does not match layout",
                    self.name
                )))
            }
        }

        if payment.required_status.is_some() != (count(&payment.roles, FieldRole::Status) == 1)
            || count(&payment.roles, FieldRole::Status) > 1
        {
            return Err(Error::Config(format!(
                "{}: status role and required status must come together",
                self.name
            )));
        }

        match (payment.linkage, payment.profile) {
            (LinkageSource::ContextMessage, ContextProfile::ParametersFirst)
            | (LinkageSource::IntentHash, ContextProfile::ContextFirst) => {
                return Err(Error::Config(format!(
                    "{}: linkage source not available in {:?} contexts",
                    self.name, payment.profile
                )))
            }
            _ => {}
        }

        let payment_recipients = count(&payment.roles, FieldRole::Recipient);
        let payment_links = count(&payment.roles, FieldRole::Link);
        let ok = match &self.identity {
            None => payment_recipients == 1 && payment_links == 0,
            Some(identity) => {
                payment_recipients == 0
                    && payment_links == 1
                    && count(&identity.roles, FieldRole::Link) == 1
                    && count(&identity.roles, FieldRole::Recipient) == 1
                    && identity.roles.iter().all(|r| {
                        matches!(r, FieldRole::Link | FieldRole::Recipient | FieldRole::Ignored)
                    })
            }
        };
        if !ok {
            return Err(Error::Config(format!(
                "{}: recipient and link roles are inconsistent with the identity proof",
                self.name
            )));
        }
        Ok(())
    }
}

/// Payment fields pulled out of one context.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedPaymentFields<'a> {
    /// Amount string.
    pub amount: Option<&'a str>,
    /// Timestamp string.
    pub timestamp: Option<&'a str>,
    /// Payee identifier.
    pub recipient: Option<&'a str>,
    /// Currency code.
    pub currency: Option<&'a str>,
    /// Provider payment id.
    pub payment_id: Option<&'a str>,
    /// Payment state.
    pub status: Option<&'a str>,
    /// Cross-proof link value.
    pub link: Option<&'a str>,
    /// Trailing `intentHash` (profile B only).
    pub intent_hash: Option<&'a str>,
    /// Trailing `providerHash`.
    pub provider_hash: B256,
}

impl ExtractedPaymentFields<'_> {
    /// Fetch a field the layout guarantees, failing closed if it is absent
    /// or empty.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Schema`] naming the field.
    pub fn require<'s>(value: Option<&'s str>, name: &str) -> Result<&'s str> {
        match value {
            Some(v) if !v.is_empty() => Ok(v),
            _ => Err(Error::Schema(format!("missing or empty {name}"))),
        }
    }
}

/// Extract and assign roles for a context.
///
/// The parameter count must equal `roles.len()` exactly and the trailing
/// linkage hashes are always required.
///
/// # Errors
///
/// Returns an extraction error for grammar violations, [`Error::Schema`] for
/// a count mismatch and [`Error::InvalidField`] for a malformed provider hash.
pub fn extract_fields<'a>(
    context: &'a str,
    profile: ContextProfile,
    roles: &[FieldRole],
) -> Result<ExtractedPaymentFields<'a>> {
    let values = extract_all_from_context(context, roles.len().max(1), true, profile)?;
    let trailing = profile.trailing_fields().len();
    let params = values.len() - trailing;
    if params != roles.len() {
        return Err(Error::Schema(format!(
            "expected {} extracted parameters, found {params}",
            roles.len()
        )));
    }

    let mut fields = ExtractedPaymentFields {
        provider_hash: values[values.len() - 1].parse()?,
        ..ExtractedPaymentFields::default()
    };
    if profile == ContextProfile::ParametersFirst {
        fields.intent_hash = Some(values[params]);
    }

    for (role, value) in roles.iter().zip(&values[..params]) {
        let slot = match role {
            FieldRole::Amount => &mut fields.amount,
            FieldRole::Timestamp => &mut fields.timestamp,
            FieldRole::Recipient => &mut fields.recipient,
            FieldRole::Currency => &mut fields.currency,
            FieldRole::PaymentId => &mut fields.payment_id,
            FieldRole::Status => &mut fields.status,
            FieldRole::Link => &mut fields.link,
            FieldRole::Ignored => continue,
        };
        *slot = Some(value);
    }
    Ok(fields)
}
