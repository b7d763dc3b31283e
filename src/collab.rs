//! External collaborator seams (spec.md §1 "out of scope", SPEC_FULL.md
//! §10): trait interfaces the core calls into but never implements.
//! User accounts/balances and the existence pre-filter membership
//! structure live in other subsystems; this crate only needs their
//! shape.

//! Neither collaborator needs to block the coordinator, so both seams
//! are plain synchronous callbacks the caller can spawn off a task for
//! if the real implementation does I/O — the same shape the teacher
//! uses for its `broadcast::Sender<OrderUpdateEvent>` fire-and-forget
//! notifications in `main.rs`, rather than reaching for `async-trait`
//! (unused anywhere in this crate's dependency stack).

/// Notified when an Order is created, so an external membership
/// structure (e.g. a bloom filter or cache the REST/SSE surface
/// consults) can add it before clients ask about it.
pub trait OrderExistencePrefilter: Send + Sync {
    fn register(&self, order_id: i64, symbol: &str);
}

/// Balance holds/releases the core triggers around order lifecycle
/// transitions it does not itself enforce (no funds are frozen or
/// debited by this crate — spec.md §1).
pub trait BalanceReservation: Send + Sync {
    fn release(&self, order_id: i64);
}

/// No-op implementations used where no collaborator is wired, e.g. in
/// tests and standalone deployments of just the matching core.
pub struct NoopPrefilter;

impl OrderExistencePrefilter for NoopPrefilter {
    fn register(&self, _order_id: i64, _symbol: &str) {}
}

pub struct NoopBalanceReservation;

impl BalanceReservation for NoopBalanceReservation {
    fn release(&self, _order_id: i64) {}
}
