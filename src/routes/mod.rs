/// Router Module Index
///
/// Splits the routing table by who may reach each endpoint. Role checks themselves live
/// in the handler signatures (`Session`, `Authorized<P>`) and in the page gate; these
/// modules only group the routes.

/// Routes open to anonymous callers: reference data reads, registration, health.
pub mod public;

/// Routes that need a session. Mutations additionally declare a role policy.
pub mod authenticated;

/// Role pages under `/applicant`, `/reviewer`, `/admin` and `/compliance`.
/// Guarded by `gate::page_gate`, which redirects instead of answering with an error.
pub mod pages;
