pub mod reconciler;
pub mod verification_manager;

pub use reconciler::run_reconciliation_loop;
pub use verification_manager::{
    create_shared_verification_manager, JoinOutcome, KickFailurePolicy, MemberJoin,
    SharedVerificationManager, VerifyOutcome,
};
