//! Database layer (Firestore).

pub mod firestore;

pub use self::firestore::{
    new_document_id, CouponFilter, CouponPage, FirestoreDb, PageRequest, PrivateCouponFilter,
};

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    /// Email uniqueness claims (document ID = URL-encoded email)
    pub const USER_EMAILS: &str = "user_emails";
    pub const COUPONS: &str = "coupons";
    pub const PRIVATE_COUPONS: &str = "private_coupons";
}
