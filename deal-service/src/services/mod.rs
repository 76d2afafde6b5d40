mod database;
mod edgar;
mod guard;
mod jwt;
mod scoring;
mod storage;

pub use database::Database;
pub use edgar::{
    CompanyFilings, EdgarHttpSource, EdgarService, Filing, FilingsError, FilingsPage,
    FilingsQuery, FilingsSource,
};
pub use guard::{require_membership, require_role};
pub use jwt::{AccessClaims, JwtVerifier};
pub use scoring::{
    DealContext, DealScore, DocumentReview, HttpScoringProvider, MockScoringProvider,
    ProviderError, ScoreFactor, ScoringProvider, TargetBrief,
};
pub use storage::{LocalStorage, Storage};
