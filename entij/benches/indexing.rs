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
//! Benchmarks for Terrain indexing and entity set queries
//!
//! Measures the cost of keeping indices current as entities move, and of
//! predicate queries over entity sets.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use entij::{filters, Entity, EntityMultiMap, EntitySet, Terrain};

fn populated_terrain(n_entities: usize) -> (Terrain, Vec<Entity>) {
    let terrain = Terrain::named("bench");
    let entities: Vec<Entity> = (0..n_entities)
        .map(|i| Entity::with("unit", i as i64, (i % 4) as i64))
        .collect();
    for e in &entities {
        terrain.add(e);
    }
    (terrain, entities)
}

fn bench_terrain_reindex(c: &mut Criterion) {
    let mut group = c.benchmark_group("terrain_reindex");

    for n_entities in [10, 100, 1000].iter() {
        let (terrain, entities) = populated_terrain(*n_entities);

        group.bench_with_input(
            BenchmarkId::new("set_posit", n_entities),
            n_entities,
            |b, &n| {
                let mut tick = 0i64;
                b.iter(|| {
                    tick += 1;
                    for (i, e) in entities.iter().enumerate() {
                        e.set_posit(black_box((i as i64 + tick) % n as i64));
                    }
                });
            },
        );

        black_box(terrain.get_all().len());
    }

    group.finish();
}

fn bench_terrain_lookup(c: &mut Criterion) {
    let (terrain, _entities) = populated_terrain(1000);

    c.bench_function("terrain_get_by_posit", |b| {
        let mut posit = 0i64;
        b.iter(|| {
            posit = (posit + 1) % 1000;
            black_box(terrain.get_by_posit(posit).len())
        });
    });
}

fn bench_add_remove(c: &mut Criterion) {
    let mut group = c.benchmark_group("terrain_membership");

    for n_entities in [100, 1000].iter() {
        let entities: Vec<Entity> = (0..*n_entities)
            .map(|i| Entity::with("unit", i as i64, 0))
            .collect();

        group.bench_with_input(
            BenchmarkId::new("add_then_remove", n_entities),
            n_entities,
            |b, _| {
                let terrain = Terrain::new();
                b.iter(|| {
                    for e in &entities {
                        terrain.add(e);
                    }
                    for e in &entities {
                        terrain.remove(e);
                    }
                });
            },
        );
    }

    group.finish();
}

fn bench_multimap(c: &mut Criterion) {
    let entities: Vec<Entity> = (0..1000).map(|_| Entity::new()).collect();

    c.bench_function("multimap_add_remove_1000", |b| {
        let map = EntityMultiMap::with_capacity(64);
        b.iter(|| {
            for (i, e) in entities.iter().enumerate() {
                map.add_to_key(i % 64, e);
            }
            for (i, e) in entities.iter().enumerate() {
                map.remove_from_key(&(i % 64), e);
            }
            black_box(map.size())
        });
    });
}

fn bench_set_queries(c: &mut Criterion) {
    let mut group = c.benchmark_group("entity_set_queries");

    for n_entities in [100, 1000, 10000].iter() {
        let set: EntitySet = (0..*n_entities)
            .map(|i| Entity::with("unit", i as i64, (i % 4) as i64))
            .collect();

        group.bench_with_input(BenchmarkId::new("count", n_entities), n_entities, |b, _| {
            b.iter(|| black_box(set.count(filters::in_state(2))));
        });

        group.bench_with_input(BenchmarkId::new("filter", n_entities), n_entities, |b, _| {
            b.iter(|| black_box(set.filter(filters::in_state(1)).len()));
        });

        let other: EntitySet = set.filter(filters::in_state(0));
        group.bench_with_input(BenchmarkId::new("not", n_entities), n_entities, |b, _| {
            b.iter(|| black_box(set.not(&other).len()));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_terrain_reindex,
    bench_terrain_lookup,
    bench_add_remove,
    bench_multimap,
    bench_set_queries,
);
criterion_main!(benches);
