use crate::store::{keys, operations::knowledge::KnowledgePoint};
use crate::store::{Store, StoreError};

const VERSION_KEY: &str = "_meta:version";

type MigrationFn = fn(&Store) -> Result<(), StoreError>;

fn migrations() -> Vec<(&'static str, MigrationFn)> {
    vec![
        ("001_initial", m001_initial),
        ("002_knowledge_point_base_index", m002_knowledge_point_base_index),
    ]
}

/// 执行所有未应用的迁移。
///
/// 每个迁移必须幂等：进程可能在迁移完成之后、版本号写入之前崩溃，
/// 重启后会再次执行。版本号只能前进。
pub fn run(store: &Store) -> Result<(), StoreError> {
    let current = get_current_version(store)?;

    for (index, (name, func)) in migrations().iter().enumerate() {
        let version = (index + 1) as u32;
        if version <= current {
            tracing::debug!(version, name, "Migration already applied, skipping");
            continue;
        }
        tracing::info!(version, name, "Running migration");
        func(store)?;
        set_version(store, version)?;
        tracing::info!(version, name, "Migration complete");
    }

    Ok(())
}

pub fn latest_version() -> u32 {
    migrations().len() as u32
}

pub fn get_current_version(store: &Store) -> Result<u32, StoreError> {
    match store.config_versions.get(VERSION_KEY.as_bytes())? {
        Some(raw) => {
            let bytes: [u8; 4] = raw.as_ref().try_into().map_err(|_| StoreError::Migration {
                version: 0,
                message: format!("corrupt version marker ({} bytes)", raw.len()),
            })?;
            Ok(u32::from_be_bytes(bytes))
        }
        None => Ok(0),
    }
}

pub fn set_version(store: &Store, version: u32) -> Result<(), StoreError> {
    let current = get_current_version(store)?;
    if version < current {
        return Err(StoreError::Migration {
            version,
            message: format!("Refuse to downgrade from {} to {}", current, version),
        });
    }

    store
        .config_versions
        .insert(VERSION_KEY.as_bytes(), &version.to_be_bytes())?;
    Ok(())
}

fn m001_initial(_store: &Store) -> Result<(), StoreError> {
    Ok(())
}

/// Rebuilds the base -> point index from the primary tree.
fn m002_knowledge_point_base_index(store: &Store) -> Result<(), StoreError> {
    for item in store.knowledge_points.iter() {
        let (_, value) = item?;
        let point: KnowledgePoint = Store::deserialize(&value)?;
        let idx_key = keys::knowledge_point_base_index_key(&point.knowledge_base_id, &point.id);
        store
            .knowledge_points_by_base
            .insert(idx_key.as_bytes(), point.id.as_bytes())?;
    }
    Ok(())
}
