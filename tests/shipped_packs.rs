//! The shipped block and vein packs agree with the built-in palette.

use std::path::PathBuf;

use terra_assets::{registry_from_file, vein_pack_from_file, BlockRegistry};
use terra_core::RegistryKey;
use terra_world::{
    ids, tags, BlockCatalog, BlockId, ChunkPos, ChunkWorld, DefaultBlocks, SharedDeferredStore,
    VeinFeature, WorldGenerator, CHUNK_SIZE_X, CHUNK_SIZE_Y, CHUNK_SIZE_Z,
};

fn config_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("config").join(name)
}

fn registry() -> BlockRegistry {
    registry_from_file(&config_path("blocks.json")).expect("config/blocks.json loads")
}

fn features(registry: &BlockRegistry) -> Vec<VeinFeature> {
    vein_pack_from_file(&config_path("veins.json"))
        .expect("config/veins.json parses")
        .features(registry)
        .expect("config/veins.json resolves")
}

fn id_of(registry: &BlockRegistry, name: &str) -> BlockId {
    registry
        .id_by_name(name)
        .unwrap_or_else(|| panic!("missing block name in blocks.json: {name}"))
}

#[test]
fn block_ids_match_blocks_json() {
    let registry = registry();

    assert_eq!(ids::AIR, id_of(&registry, "air"));
    assert_eq!(ids::STONE, id_of(&registry, "stone"));
    assert_eq!(ids::DIRT, id_of(&registry, "dirt"));
    assert_eq!(ids::GRASS, id_of(&registry, "grass"));
    assert_eq!(ids::SAND, id_of(&registry, "sand"));
    assert_eq!(ids::GRAVEL, id_of(&registry, "gravel"));
    assert_eq!(ids::WATER, id_of(&registry, "water"));
    assert_eq!(ids::GRANITE, id_of(&registry, "granite"));
    assert_eq!(ids::TALL_GRASS, id_of(&registry, "tall_grass"));
    assert_eq!(ids::BEDROCK, id_of(&registry, "bedrock"));
    assert_eq!(ids::OAK_LOG, id_of(&registry, "oak_log"));
    assert_eq!(ids::OAK_LEAVES, id_of(&registry, "oak_leaves"));

    // Ores and their surface markers.
    assert_eq!(ids::COAL_ORE, id_of(&registry, "coal_ore"));
    assert_eq!(ids::IRON_ORE, id_of(&registry, "iron_ore"));
    assert_eq!(ids::GOLD_ORE, id_of(&registry, "gold_ore"));
    assert_eq!(ids::DIAMOND_ORE, id_of(&registry, "diamond_ore"));
    assert_eq!(ids::COAL_PEBBLE, id_of(&registry, "coal_pebble"));
    assert_eq!(ids::IRON_PEBBLE, id_of(&registry, "iron_pebble"));
    assert_eq!(ids::GOLD_PEBBLE, id_of(&registry, "gold_pebble"));
}

#[test]
fn block_facts_match_builtin_catalog() {
    let registry = registry();
    let tag_keys: Vec<RegistryKey> = [tags::ORE_REPLACEABLES, tags::STONE, tags::LOGS]
        .into_iter()
        .map(tags::key)
        .collect();

    for id in 0..registry.len() as BlockId {
        let name = &registry.descriptor(id).unwrap().name;
        assert_eq!(
            registry.is_replaceable(id),
            DefaultBlocks.is_replaceable(id),
            "replaceable: {name}"
        );
        assert_eq!(registry.is_solid(id), DefaultBlocks.is_solid(id), "solid: {name}");
        assert_eq!(
            registry.needs_support(id),
            DefaultBlocks.needs_support(id),
            "needs_support: {name}"
        );
        for tag in &tag_keys {
            assert_eq!(
                registry.has_tag(id, tag),
                DefaultBlocks.has_tag(id, tag),
                "{tag} on {name}"
            );
        }
    }
}

#[test]
fn vein_pack_names_are_unique_and_ordered() {
    let registry = registry();
    let names: Vec<String> = features(&registry).into_iter().map(|f| f.name).collect();
    assert_eq!(names, ["coal", "iron", "gold", "diamond"]);
}

#[test]
fn pack_and_builtin_catalogs_generate_the_same_world() {
    let registry = registry();
    let features = features(&registry);
    let order: Vec<ChunkPos> = (-2..=2)
        .flat_map(|z| (-2..=2).map(move |x| ChunkPos::new(x, z)))
        .collect();

    let pack_store = SharedDeferredStore::default();
    let pack_generator = WorldGenerator::new(77, features.clone(), pack_store.clone());
    let mut pack_world = ChunkWorld::new(registry);

    let builtin_store = SharedDeferredStore::default();
    let builtin_generator = WorldGenerator::new(77, features, builtin_store.clone());
    let mut builtin_world = ChunkWorld::with_default_blocks();

    for &pos in &order {
        pack_generator.generate_chunk(&mut pack_world, pos);
        builtin_generator.generate_chunk(&mut builtin_world, pos);
    }

    let mut ores = 0;
    for &pos in &order {
        let a = pack_world.storage().get(pos).unwrap();
        let b = builtin_world.storage().get(pos).unwrap();
        ores += a.count_blocks(ids::COAL_ORE) + a.count_blocks(ids::IRON_ORE);
        for y in 0..CHUNK_SIZE_Y {
            for z in 0..CHUNK_SIZE_Z {
                for x in 0..CHUNK_SIZE_X {
                    assert_eq!(a.block(x, y, z), b.block(x, y, z), "chunk {pos} at {x},{y},{z}");
                }
            }
        }
    }
    assert!(ores > 0, "the shipped veins should place ore");
    assert_eq!(pack_store.snapshot(), builtin_store.snapshot());
}
