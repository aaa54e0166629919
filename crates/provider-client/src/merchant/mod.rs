pub mod client;
pub mod deeplink;
pub mod normalize;
pub mod types;

pub use client::{
    BareSessionStrategy, DirectApiStrategy, MerchantSearcher, SearchStrategy, StrategyError,
    WarmedSessionStrategy,
};
pub use types::MerchantSearchResult;
