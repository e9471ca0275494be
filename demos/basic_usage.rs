//! Walks through the common lifecycle: construct a pool, wrap a value in a
//! `SmartPointer`, share it, explicitly free it, and let the pool's leak
//! dump run at teardown.

use anyhow::Context;
use poolguard::{PoolAllocator, PoolConfig, SmartPointer};

struct Entity {
    hp: i32,
}

fn main() -> anyhow::Result<()> {
    let pool: &'static PoolAllocator<Entity> = Box::leak(Box::new(
        PoolAllocator::with_log_file("entity_pool.log", PoolConfig::new().with_blocks_per_page(64))
            .context("opening pool log file")?,
    ));

    let player = SmartPointer::new(pool, Entity { hp: 100 }, poolguard::callsite!());
    let same_player = player.clone();
    assert_eq!(player, same_player);
    println!("player hp = {}", player.hp);

    let mut player = player;
    player.free(poolguard::callsite!());
    assert!(player.is_null());
    // `same_player` still references the original handle, but that
    // handle's storage was just cleared: it is dangling, not null.
    assert!(same_player.handle().storage().is_none());

    Ok(())
}
