//! Transaction construction, signing and propagation

mod builder;
mod gas;
mod nonce;
mod sender;

pub use builder::{build, build_from_args, BuildObserver, LoggingObserver};
pub use gas::GasResolver;
pub use nonce::{
    default_tracked_pending_chains, NoncePolicy, NonceResolver, OPTIMISM_GOERLI,
    OPTIMISM_MAINNET, OPTIMISM_SEPOLIA,
};
pub use sender::{SendOutcome, Transactor};
