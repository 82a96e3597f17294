// Helper for generating UUIDv7 (timestamp-sortable UUIDs)
//
// `api_keys` and `refresh_tokens` ids are generated app-side so rows sort by
// creation time. `users` keeps PG's gen_random_uuid() (v4).

use uuid::Uuid;

/// Generate a new UUIDv7 (timestamp-sortable).
pub fn uuidv7() -> Uuid {
    Uuid::now_v7()
}
