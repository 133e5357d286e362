// HealthManager-api lib.rs
//
// HTTP surface of the HealthManager application: routing, handlers,
// response envelopes and the OpenAPI document.

// Public modules
pub mod api;
pub mod entities;
pub mod openapi;
