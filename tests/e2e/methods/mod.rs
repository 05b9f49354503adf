//! Per-method E2E tests.
//!
//! ## Test Categories
//!
//! Each method has tests covering:
//! 1. **Acceptance**: a well-formed proof releases funds
//! 2. **Matching rules**: amount, timestamp, recipient, currency
//! 3. **Layout**: method-specific fields such as status or identity links
//! 4. **Replay**: a consumed payment id is never accepted again

mod venmo;
mod witness;
