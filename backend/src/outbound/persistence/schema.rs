//! Diesel table definitions for the PostgreSQL schema.
//!
//! These definitions must match `backend/migrations` exactly.

diesel::table! {
    /// Reference table of roles and their privilege levels.
    roles (id) {
        id -> Int8,
        name -> Varchar,
        level -> Int4,
        description -> Nullable<Text>,
    }
}

diesel::table! {
    /// User accounts. Emails are stored lowercased.
    users (id) {
        id -> Int8,
        email -> Varchar,
        username -> Varchar,
        /// bcrypt hash.
        password -> Varchar,
        is_active -> Bool,
        role_id -> Int8,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Pending invitations keyed by the sha256 hex of the plaintext token.
    user_invitations (token) {
        token -> Varchar,
        user_id -> Int8,
        expiry -> Timestamptz,
    }
}

diesel::table! {
    posts (id) {
        id -> Int8,
        user_id -> Int8,
        title -> Varchar,
        content -> Text,
        tags -> Array<Text>,
        /// Optimistic concurrency counter, bumped on every update.
        version -> Int4,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    comments (id) {
        id -> Int8,
        post_id -> Int8,
        user_id -> Int8,
        content -> Text,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// `follower_id` follows `user_id`.
    followers (user_id, follower_id) {
        user_id -> Int8,
        follower_id -> Int8,
        created_at -> Timestamptz,
    }
}

diesel::joinable!(users -> roles (role_id));
diesel::joinable!(user_invitations -> users (user_id));
diesel::joinable!(posts -> users (user_id));
diesel::joinable!(comments -> posts (post_id));
diesel::joinable!(comments -> users (user_id));

diesel::allow_tables_to_appear_in_same_query!(
    comments,
    followers,
    posts,
    roles,
    user_invitations,
    users,
);
