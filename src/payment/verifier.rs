//! Proof-based payment verification pipeline.
//!
//! This is the core verification logic shared by every witnessed payment
//! method. The method only contributes a [`MethodLayout`]; the pipeline
//! runs the same fail-fast sequence for all of them and commits nothing
//! until the final nullifier write.

use crate::config::{currency_code, VerifierConfig};
use crate::error::{Error, Result};
use crate::event::{
    create_event_channel, VerifierEvent, VerifierEventsChannel, VerifierEventsSender,
};
use crate::extract::extract_field_from_context;
use crate::payment::amount::{parse_fixed_point, parse_timestamp, required_payment};
use crate::payment::intent::{PaymentIntentParams, VerificationOutcome, VerifyPaymentRequest};
use crate::payment::method::{
    extract_fields, CurrencySource, ExtractedPaymentFields, LinkageSource, MethodLayout,
    PaymentMethod,
};
use crate::payment::nullifier::{derive_nullifier, NullifierRegistry};
use crate::payment::registry::AllowList;
use crate::payment::strategy::PaymentVerification;
use crate::payment::token::TokenMetadata;
use crate::proof::{decode_payment_proof, decode_witnesses, PaymentProof, Proof};
use crate::signature::verify_threshold;
use crate::types::{keccak256, Address, B256};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, warn};

const PROVIDER_HASH_MARKER: &str = "\"providerHash\":\"";
const CONTEXT_MESSAGE_MARKER: &str = "\"contextMessage\":\"";

/// Owner-managed configuration, guarded by one lock.
struct VerifierState {
    provider_hashes: AllowList<B256>,
    currencies: AllowList<B256>,
    timestamp_buffer_secs: u64,
}

/// Verifier for one witnessed payment method.
///
/// Holds the approved provider hashes, supported currencies and timestamp
/// buffer for its method. [`PaymentVerifier::verify_payment`] holds the state
/// lock for the whole call, so verifications and administrative changes are
/// totally ordered.
pub struct PaymentVerifier {
    layout: MethodLayout,
    address: Address,
    owner: Address,
    escrow: Address,
    min_witness_signatures: usize,
    tokens: Arc<dyn TokenMetadata>,
    nullifiers: Arc<dyn NullifierRegistry>,
    state: Mutex<VerifierState>,
    events_tx: VerifierEventsSender,
}

/// Payment fields that passed steps 2 to 7.
struct CheckedProof<'a> {
    proof: &'a Proof,
    fields: ExtractedPaymentFields<'a>,
}

impl PaymentVerifier {
    /// Build a verifier for `method` from `config`.
    ///
    /// Token precision comes from `config.tokens`; see
    /// [`PaymentVerifier::with_token_metadata`] to use another source.
    /// `config.address` must be granted write permission on `nullifiers`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the configuration or the method layout
    /// is invalid.
    pub fn from_config(
        method: &PaymentMethod,
        config: &VerifierConfig,
        nullifiers: Arc<dyn NullifierRegistry>,
    ) -> Result<Self> {
        config.validate()?;
        let layout = method.layout();
        layout.validate()?;

        let mut provider_hashes = AllowList::new("provider hash");
        for hash in &config.provider_hashes {
            provider_hashes.add(*hash)?;
        }
        let mut currencies = AllowList::new("currency");
        for code in config.currency_codes() {
            currencies.add(code)?;
        }

        let (events_tx, _) = create_event_channel();

        info!(
            "Payment verifier initialized (method={}, provider_hashes={}, currencies={}, min_witness_signatures={})",
            layout.name,
            provider_hashes.len(),
            currencies.len(),
            config.min_witness_signatures
        );

        Ok(Self {
            layout,
            address: config.address,
            owner: config.owner,
            escrow: config.escrow,
            min_witness_signatures: config.min_witness_signatures,
            tokens: Arc::new(config.token_registry()),
            nullifiers,
            state: Mutex::new(VerifierState {
                provider_hashes,
                currencies,
                timestamp_buffer_secs: config.timestamp_buffer_secs,
            }),
            events_tx,
        })
    }

    /// Replace the token precision source.
    #[must_use]
    pub fn with_token_metadata(mut self, tokens: Arc<dyn TokenMetadata>) -> Self {
        self.tokens = tokens;
        self
    }

    /// Subscribe to verifier events.
    #[must_use]
    pub fn subscribe_events(&self) -> VerifierEventsChannel {
        self.events_tx.subscribe()
    }

    /// Layout of the verified method.
    #[must_use]
    pub const fn layout(&self) -> &MethodLayout {
        &self.layout
    }

    /// Escrow allowed to call [`PaymentVerifier::verify_payment`].
    #[must_use]
    pub const fn escrow(&self) -> Address {
        self.escrow
    }

    /// Administrator.
    #[must_use]
    pub const fn owner(&self) -> Address {
        self.owner
    }

    /// Identity used to write nullifiers.
    #[must_use]
    pub const fn address(&self) -> Address {
        self.address
    }

    /// Witness signature threshold.
    #[must_use]
    pub const fn min_witness_signatures(&self) -> usize {
        self.min_witness_signatures
    }

    /// Verify a payment proof against a pending intent and consume its
    /// nullifier.
    ///
    /// # Errors
    ///
    /// Every rejection is an error; see [`Error::kind`] for the categories.
    /// A rejected call changes no state.
    pub fn verify_payment(
        &self,
        caller: &Address,
        request: &VerifyPaymentRequest,
    ) -> Result<VerificationOutcome> {
        let state = self.state.lock();

        if *caller != self.escrow {
            warn!("Rejected verify_payment from {caller}: not the escrow");
            return Err(Error::Unauthorized(format!("{caller} is not the escrow")));
        }

        let bundle = decode_payment_proof(&request.payment_proof)?;
        let witnesses = decode_witnesses(&request.data)?;
        let intent = &request.intent;

        let (payment, identity) = match (&bundle, &self.layout.identity) {
            (PaymentProof::Single(proof), None) => (proof, None),
            (PaymentProof::Linked { payment, identity }, Some(_)) => (payment, Some(identity)),
            (PaymentProof::Single(_), Some(_)) => {
                return Err(Error::Decode(format!(
                    "{} requires a linked identity proof",
                    self.layout.name
                )))
            }
            (PaymentProof::Linked { .. }, None) => {
                return Err(Error::Decode(format!(
                    "{} does not accept a linked identity proof",
                    self.layout.name
                )))
            }
        };

        let payment = self.check_proof(&state, payment, &witnesses, PaymentSide::Payment)?;
        let identity = identity
            .map(|proof| self.check_proof(&state, proof, &witnesses, PaymentSide::Identity))
            .transpose()?;

        let recipient = match &identity {
            Some(identity) => {
                let payment_link = ExtractedPaymentFields::require(payment.fields.link, "link")?;
                let identity_link = ExtractedPaymentFields::require(identity.fields.link, "link")?;
                if payment_link != identity_link {
                    warn!("Payment counterparty does not match identity proof");
                    return Err(Error::PaymentMismatch(
                        "payment counterparty does not match identity proof".to_string(),
                    ));
                }
                debug!("Identity proof linked on {payment_link}");
                ExtractedPaymentFields::require(identity.fields.recipient, "recipient")?
            }
            None => ExtractedPaymentFields::require(payment.fields.recipient, "recipient")?,
        };

        self.check_amount(&payment.fields, intent)?;
        self.check_timestamp(&payment.fields, intent, state.timestamp_buffer_secs)?;

        if keccak256(recipient.as_bytes()) != intent.payee_details {
            warn!("Recipient does not match payee details {}", intent.payee_details);
            return Err(Error::PaymentMismatch("recipient mismatch".to_string()));
        }

        self.check_currency(&payment.fields, intent, &state.currencies)?;
        self.check_status(&payment.fields)?;

        let payment_id = ExtractedPaymentFields::require(payment.fields.payment_id, "paymentId")?;
        let linkage_hash = self.linkage_hash(&payment)?;
        let nullifier = derive_nullifier(&self.layout.name, payment_id);

        self.nullifiers.add_nullifier(&self.address, nullifier)?;

        info!(
            "Payment verified (method={}, nullifier={}, linkage={})",
            self.layout.name,
            hex::encode(nullifier),
            hex::encode(linkage_hash)
        );
        let _ = self.events_tx.send(VerifierEvent::PaymentVerified {
            method: self.layout.name.clone(),
            nullifier,
            linkage_hash,
        });

        Ok(VerificationOutcome {
            verified: true,
            linkage_hash,
            nullifier,
        })
    }

    /// Steps 3 to 7 for one proof.
    fn check_proof<'a>(
        &self,
        state: &VerifierState,
        proof: &'a Proof,
        witnesses: &[Address],
        side: PaymentSide,
    ) -> Result<CheckedProof<'a>> {
        proof.check_identifier()?;

        let claim = &proof.signed_claim.claim;
        if proof.signed_claim.signatures.is_empty() {
            return Err(Error::NoSignatures);
        }
        verify_threshold(
            &claim.signing_digest(),
            &proof.signed_claim.signatures,
            witnesses,
            self.min_witness_signatures,
        )?;
        debug!("Witness signatures verified for claim {}", claim.identifier);

        let context = proof.context();
        let provider_hash: B256 =
            extract_field_from_context(context, PROVIDER_HASH_MARKER)?.parse()?;
        if !state.provider_hashes.contains(&provider_hash) {
            warn!("Provider hash {provider_hash} not approved");
            return Err(Error::UnknownProviderHash(provider_hash));
        }

        let (profile, roles) = match (side, &self.layout.identity) {
            (PaymentSide::Identity, Some(identity)) => {
                (identity.profile, identity.roles.as_slice())
            }
            _ => (self.layout.payment.profile, self.layout.payment.roles.as_slice()),
        };
        let fields = extract_fields(context, profile, roles)?;
        if fields.provider_hash != provider_hash {
            return Err(Error::Schema(format!(
                "provider hash {} does not match trailing field {}",
                provider_hash, fields.provider_hash
            )));
        }
        debug!("Extracted {:?} fields from claim {}", side, claim.identifier);

        Ok(CheckedProof { proof, fields })
    }

    fn check_amount(
        &self,
        fields: &ExtractedPaymentFields<'_>,
        intent: &PaymentIntentParams,
    ) -> Result<()> {
        let decimals = self.tokens.decimals(&intent.deposit_token).ok_or_else(|| {
            Error::PaymentMismatch(format!("unsupported deposit token {}", intent.deposit_token))
        })?;
        let amount = ExtractedPaymentFields::require(fields.amount, "amount")?;
        let paid = parse_fixed_point(amount, decimals, self.layout.payment.amount_sign)?;
        let required = required_payment(intent.intent_amount, intent.conversion_rate)?;
        if paid < required {
            warn!("Payment amount {paid} below required {required}");
            return Err(Error::PaymentMismatch(format!(
                "paid {paid}, required {required}"
            )));
        }
        Ok(())
    }

    fn check_timestamp(
        &self,
        fields: &ExtractedPaymentFields<'_>,
        intent: &PaymentIntentParams,
        buffer_secs: u64,
    ) -> Result<()> {
        let timestamp = ExtractedPaymentFields::require(fields.timestamp, "timestamp")?;
        let paid_at = parse_timestamp(timestamp, self.layout.payment.timestamp_format)?;
        if paid_at.saturating_add(buffer_secs) < intent.intent_timestamp {
            warn!(
                "Payment at {paid_at} predates intent at {} (buffer {buffer_secs}s)",
                intent.intent_timestamp
            );
            return Err(Error::PaymentMismatch(format!(
                "payment at {paid_at} predates intent at {}",
                intent.intent_timestamp
            )));
        }
        Ok(())
    }

    fn check_currency(
        &self,
        fields: &ExtractedPaymentFields<'_>,
        intent: &PaymentIntentParams,
        supported: &AllowList<B256>,
    ) -> Result<()> {
        let paid_currency = match &self.layout.payment.currency {
            CurrencySource::Fixed(code) => currency_code(code),
            CurrencySource::Extracted => {
                currency_code(ExtractedPaymentFields::require(fields.currency, "currency")?)
            }
        };
        if paid_currency != intent.fiat_currency {
            warn!("Payment currency does not match intent currency {}", intent.fiat_currency);
            return Err(Error::PaymentMismatch("currency mismatch".to_string()));
        }
        if !supported.contains(&intent.fiat_currency) {
            return Err(Error::PaymentMismatch(format!(
                "currency {} not supported",
                intent.fiat_currency
            )));
        }
        Ok(())
    }

    fn check_status(&self, fields: &ExtractedPaymentFields<'_>) -> Result<()> {
        let Some(required) = &self.layout.payment.required_status else {
            return Ok(());
        };
        let status = ExtractedPaymentFields::require(fields.status, "status")?;
        if status != required {
            warn!("Payment state {status:?}, expected {required:?}");
            return Err(Error::PaymentMismatch(format!(
                "payment state {status:?}, expected {required:?}"
            )));
        }
        Ok(())
    }

    fn linkage_hash(&self, payment: &CheckedProof<'_>) -> Result<B256> {
        match self.layout.payment.linkage {
            LinkageSource::ContextMessage => {
                let message =
                    extract_field_from_context(payment.proof.context(), CONTEXT_MESSAGE_MARKER)?;
                B256::from_uint_str(message)
            }
            LinkageSource::IntentHash => B256::from_uint_str(ExtractedPaymentFields::require(
                payment.fields.intent_hash,
                "intentHash",
            )?),
            LinkageSource::ClaimIdentifier => Ok(payment.proof.signed_claim.claim.identifier),
        }
    }

    fn ensure_owner(&self, caller: &Address) -> Result<()> {
        if *caller == self.owner {
            Ok(())
        } else {
            warn!("Rejected administrative call from {caller}");
            Err(Error::Unauthorized(format!("{caller} is not the owner")))
        }
    }

    /// Approve a provider hash.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unauthorized`] for non-owners and [`Error::Config`]
    /// if the hash is already approved.
    pub fn add_provider_hash(&self, caller: &Address, provider_hash: B256) -> Result<()> {
        self.ensure_owner(caller)?;
        self.state.lock().provider_hashes.add(provider_hash)?;
        info!("Provider hash {provider_hash} added");
        let _ = self
            .events_tx
            .send(VerifierEvent::ProviderHashAdded { provider_hash });
        Ok(())
    }

    /// Withdraw a provider hash.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unauthorized`] for non-owners and [`Error::Config`]
    /// if the hash is not approved.
    pub fn remove_provider_hash(&self, caller: &Address, provider_hash: &B256) -> Result<()> {
        self.ensure_owner(caller)?;
        self.state.lock().provider_hashes.remove(provider_hash)?;
        info!("Provider hash {provider_hash} removed");
        let _ = self.events_tx.send(VerifierEvent::ProviderHashRemoved {
            provider_hash: *provider_hash,
        });
        Ok(())
    }

    /// Whether `provider_hash` is approved.
    #[must_use]
    pub fn is_provider_hash(&self, provider_hash: &B256) -> bool {
        self.state.lock().provider_hashes.contains(provider_hash)
    }

    /// Approved provider hashes, in approval order.
    #[must_use]
    pub fn get_provider_hashes(&self) -> Vec<B256> {
        self.state.lock().provider_hashes.list()
    }

    /// Support a currency, given as its hashed code.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unauthorized`] for non-owners and [`Error::Config`]
    /// if the currency is already supported.
    pub fn add_currency(&self, caller: &Address, currency: B256) -> Result<()> {
        self.ensure_owner(caller)?;
        self.state.lock().currencies.add(currency)?;
        info!("Currency {currency} added");
        let _ = self.events_tx.send(VerifierEvent::CurrencyAdded { currency });
        Ok(())
    }

    /// Stop supporting a currency.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unauthorized`] for non-owners and [`Error::Config`]
    /// if the currency is not supported.
    pub fn remove_currency(&self, caller: &Address, currency: &B256) -> Result<()> {
        self.ensure_owner(caller)?;
        self.state.lock().currencies.remove(currency)?;
        info!("Currency {currency} removed");
        let _ = self.events_tx.send(VerifierEvent::CurrencyRemoved {
            currency: *currency,
        });
        Ok(())
    }

    /// Whether `currency` is supported.
    #[must_use]
    pub fn is_currency(&self, currency: &B256) -> bool {
        self.state.lock().currencies.contains(currency)
    }

    /// Supported currencies, in the order they were added.
    #[must_use]
    pub fn get_currencies(&self) -> Vec<B256> {
        self.state.lock().currencies.list()
    }

    /// Change the timestamp buffer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unauthorized`] for non-owners.
    pub fn set_timestamp_buffer(&self, caller: &Address, timestamp_buffer_secs: u64) -> Result<()> {
        self.ensure_owner(caller)?;
        self.state.lock().timestamp_buffer_secs = timestamp_buffer_secs;
        info!("Timestamp buffer set to {timestamp_buffer_secs}s");
        let _ = self.events_tx.send(VerifierEvent::TimestampBufferUpdated {
            timestamp_buffer_secs,
        });
        Ok(())
    }

    /// Current timestamp buffer in seconds.
    #[must_use]
    pub fn get_timestamp_buffer(&self) -> u64 {
        self.state.lock().timestamp_buffer_secs
    }
}

impl PaymentVerification for PaymentVerifier {
    fn method_name(&self) -> &str {
        &self.layout.name
    }

    fn verify_payment(
        &self,
        caller: &Address,
        request: &VerifyPaymentRequest,
    ) -> Result<VerificationOutcome> {
        Self::verify_payment(self, caller, request)
    }
}

#[derive(Debug, Clone, Copy)]
enum PaymentSide {
    Payment,
    Identity,
}
