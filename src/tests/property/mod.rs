//! Property-based tests
//!
//! - `credential_props`: credential pair invariants
//!   - A pair never has an empty half
//!   - Masking never reveals a full token
//!   - Refreshing keeps the refresh half unless rotated
//!
//! - `audit_props`: audit trail windowing
//!   - `recent_audits(n)` is always a suffix of the server order
