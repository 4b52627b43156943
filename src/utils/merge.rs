use serde_json::Value;

/// Recursively merges `overlay` into `base` and returns the result.
///
/// Objects merge key by key; every other value in `overlay` replaces the one in `base`
/// wholesale (arrays are not concatenated).
pub fn deep_merge(base: &Value, overlay: &Value) -> Value {
    let mut merged = base.clone();
    deep_merge_into(&mut merged, overlay.clone());
    merged
}

/// In-place variant of [`deep_merge`].
pub fn deep_merge_into(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) if existing.is_object() && overlay_value.is_object() => {
                        deep_merge_into(existing, overlay_value);
                    }
                    _ => {
                        base_map.insert(key, overlay_value);
                    }
                }
            }
        }
        (slot, overlay) => *slot = overlay,
    }
}
