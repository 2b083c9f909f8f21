//! Auto-generated entity ids: `hex(millis) + hex(rand32)` (spec.md §4.D Create,
//! §4.F repository storage).

use rand::Rng;

pub fn generate_id() -> String {
    let millis = chrono::Utc::now().timestamp_millis().max(0) as u64;
    let rand32: u32 = rand::rng().random();
    format!("{:x}{:x}", millis, rand32)
}
