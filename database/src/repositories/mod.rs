// Repository functions take any sqlx executor, so the same call runs against
// the pool or inside a transaction (`&mut *tx`).

pub mod entity;
pub mod relationship;
pub mod user;

pub use entity::EntityRepository;
pub use relationship::RelationshipRepository;
pub use user::UserRepository;

/// `None` and the `all` pseudo-domain both mean "no domain filter".
pub(crate) fn domain_filter(domain: Option<&str>) -> Option<&str> {
    domain.filter(|d| !d.is_empty() && *d != kgviz_models::ALL_DOMAINS)
}

/// Trimmed, non-empty search term.
pub(crate) fn search_term(q: Option<&str>) -> Option<&str> {
    q.map(str::trim).filter(|q| !q.is_empty())
}
