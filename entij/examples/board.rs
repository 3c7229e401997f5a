// Copyright 2025 John Brosnihan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//! Board game demo
//!
//! Pieces on a one-dimensional board react to dice rolls. The board is a
//! Terrain, so the pieces occupying each square are always at hand; landing
//! on an occupied square sends the other pieces back to the start through a
//! cascade. Rolls are played asynchronously on pooled workers.
//!
//! Run with `RUST_LOG=debug cargo run --example board` to see the pool and
//! Terrain at work.

use entij::{
    filters, AsyncEntryPool, Entity, LifecycleKind, MapLogic, PoolConfig, Reaction, Terrain, Value,
    ValueKind,
};
use log::info;

const SQUARES: i64 = 20;
const PLAYING: i64 = 0;
const FINISHED: i64 = 1;

fn piece(name: &str, board: &Terrain) -> Entity {
    let piece = Entity::named(name);
    let occupied = board.clone();
    piece.add_logic(
        MapLogic::new()
            .map("home", |_: &Entity, _: &Value| Some(Reaction::new().posit(0)))
            .map_kind_when(
                ValueKind::Int,
                |e: &Entity, _: &Value| e.state() == PLAYING,
                move |e: &Entity, roll: &Value| {
                    let target = (e.posit() + roll.get::<i64>().ok()?).min(SQUARES);
                    let mut reaction = Reaction::new().posit(target).set("last_roll", roll.clone());
                    if target == SQUARES {
                        reaction = reaction.state(FINISHED);
                    }
                    let others: Vec<Entity> = occupied
                        .get_by_posit(target)
                        .iter()
                        .filter(|other| other != e)
                        .collect();
                    if !others.is_empty() && target != SQUARES {
                        reaction = reaction.and_then_move_each(others, "home").ok()?;
                    }
                    Some(reaction)
                },
            ),
    );
    board.add(&piece);
    piece
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let board = Terrain::named("board");
    board.add_lifecycle_listener(|event| {
        if event.kind == LifecycleKind::Added {
            info!("{} joined the board", event.source);
        }
    });

    let pieces: Vec<Entity> = ["red", "green", "blue"]
        .iter()
        .map(|name| piece(name, &board))
        .collect();
    for p in &pieces {
        let name = p.to_string();
        p.add_position_listener(move |event| {
            if event.changed() {
                info!("{} moved {} -> {}", name, event.previous, event.next);
            }
        });
    }

    let pool = AsyncEntryPool::with_config(PoolConfig::from_env());
    let rolls = [3_i64, 5, 3, 6, 2, 6, 4, 4, 1, 5, 6, 6, 2, 3, 6, 5];
    let mut turn = 0;
    while board.get_by_state(FINISHED).is_empty() && turn < 60 {
        for p in &pieces {
            let roll = rolls[turn % rolls.len()];
            turn += 1;
            if let Err(err) = p.react_async(&pool, roll).and_then(|handle| handle.wait()) {
                log::error!("{} could not play: {}", p, err);
            }
        }
    }

    for p in board.get_by_state(FINISHED).iter() {
        info!("{} reached square {}", p, SQUARES);
    }
    let still_home = board.get_all().iter().filter(filters::at(0)).count();
    info!("{} piece(s) back at the start", still_home);
    info!("pool statistics: {:?}", pool.stats());

    pool.shutdown_now();
    pool.join_retired();
}
