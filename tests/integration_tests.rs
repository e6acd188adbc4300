//! Integration Tests - End-to-End Scenarios
//!
//! Exercises the full optimizer lifecycle: metadata -> graph -> villages ->
//! path exploration -> reinforcement -> decay -> promotion.

use aco_core::*;
use std::collections::HashMap;
use std::sync::Arc;

/// Route engine logs through the test capture writer
fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Geography schema: address -> city -> region -> country
fn geo_metadata() -> HashMap<ResourceName, Vec<FieldMeta>> {
    let mut metadata = HashMap::new();
    metadata.insert(
        "address".to_string(),
        vec![
            FieldMeta::plain("id"),
            FieldMeta::foreign_key("city_id", "city"),
        ],
    );
    metadata.insert(
        "city".to_string(),
        vec![
            FieldMeta::plain("id"),
            FieldMeta::foreign_key("region_id", "region"),
        ],
    );
    metadata.insert(
        "region".to_string(),
        vec![
            FieldMeta::plain("id"),
            FieldMeta::foreign_key("country_id", "country"),
        ],
    );
    metadata.insert("country".to_string(), vec![FieldMeta::plain("id")]);
    metadata
}

/// Test: repeated requests for the same join path promote exactly one
/// materialized view, later requests only bump its usage counter
#[test]
fn test_hot_path_promotion_lifecycle() {
    init_tracing();
    let views: Arc<MemoryRepository<MaterializedView>> = Arc::new(MemoryRepository::new());
    let indexes: Arc<MemoryRepository<IndexTracking>> = Arc::new(MemoryRepository::new());
    let requests: Arc<MemoryRepository<PathRequest>> = Arc::new(MemoryRepository::new());

    let config = AcoConfig {
        promotion_pheromone_threshold: 1.0,
        promotion_min_samples: 3,
        ..Default::default()
    };
    let engine = AcoEngine::new(
        config,
        &geo_metadata(),
        Arc::new(UnitCostEstimator),
        requests.clone(),
        views.clone(),
        indexes.clone(),
    )
    .unwrap();

    // Each traversal costs 3.0 and contributes q / 3.0; the cumulative
    // contribution crosses 1.0 on the fourth request
    for _ in 0..3 {
        engine
            .find_path("address", &["country".to_string()])
            .unwrap()
            .unwrap();
    }
    assert_eq!(views.len(), 0);

    engine
        .find_path("address", &["country".to_string()])
        .unwrap()
        .unwrap();
    assert_eq!(views.len(), 1);

    // Three more identical requests: still one view, usage keeps counting
    for _ in 0..3 {
        engine
            .find_path("address", &["country".to_string()])
            .unwrap()
            .unwrap();
    }
    assert_eq!(views.len(), 1);

    let (_, view) = views.scan().unwrap().into_iter().next().unwrap();
    assert_eq!(view.usage_count, 7);
    assert!(view.definition.starts_with("SELECT * FROM address"));

    // Every recorded request for the promoted signature is flagged
    let flagged = requests
        .scan()
        .unwrap()
        .into_iter()
        .filter(|(_, r)| r.materialized_view_created)
        .count();
    assert_eq!(flagged, 4);

    println!("✓ Hot path promotion lifecycle completed");
}

/// Test: every successful traversal appends one path request with the
/// traversal's cost and contribution
#[test]
fn test_path_request_telemetry() {
    let views: Arc<MemoryRepository<MaterializedView>> = Arc::new(MemoryRepository::new());
    let indexes: Arc<MemoryRepository<IndexTracking>> = Arc::new(MemoryRepository::new());
    let requests: Arc<MemoryRepository<PathRequest>> = Arc::new(MemoryRepository::new());

    let engine = AcoEngine::new(
        AcoConfig::default(),
        &geo_metadata(),
        Arc::new(UnitCostEstimator),
        requests.clone(),
        views,
        indexes,
    )
    .unwrap();

    for _ in 0..5 {
        engine
            .find_path("address", &["country".to_string()])
            .unwrap()
            .unwrap();
    }

    let rows = requests.scan().unwrap();
    assert_eq!(rows.len(), 5);
    for (_, row) in rows {
        assert_eq!(row.cost, 3.0);
        assert_eq!(row.path.len(), 3);
        assert!(row.pheromone_contribution > 0.0);
    }
}

/// Test: decay is monotonic non-increasing absent reinforcement, and never
/// drops below the floor
#[test]
fn test_decay_monotonic_without_reinforcement() {
    let engine = AcoEngine::in_memory(AcoConfig::default(), &geo_metadata()).unwrap();
    let key = EdgeKey::new("address", "city");

    engine
        .find_path("address", &["country".to_string()])
        .unwrap()
        .unwrap();

    let decay_loop = engine.reinforcement_loop();
    let mut previous = engine.store().get(&key).unwrap().pheromone.level();
    for _ in 0..50 {
        decay_loop.run_once();
        let current = engine.store().get(&key).unwrap().pheromone.level();
        assert!(current <= previous);
        assert!(current >= Pheromone::FLOOR);
        previous = current;
    }
}

/// Test: reinforcement outpaces decay for a frequently requested path
#[test]
fn test_frequent_path_stays_reinforced() {
    let engine = AcoEngine::in_memory(AcoConfig::default(), &geo_metadata()).unwrap();
    let key = EdgeKey::new("address", "city");
    let decay_loop = engine.reinforcement_loop();

    for _ in 0..10 {
        engine
            .find_path("address", &["country".to_string()])
            .unwrap()
            .unwrap();
        decay_loop.run_once();
    }

    let level = engine.store().get(&key).unwrap().pheromone.level();
    assert!(level > Pheromone::FLOOR);
}

/// Test: four chained resources with max_group_size 3 split into a 3-node
/// group and a 1-node leftover
#[test]
fn test_geography_village_split() {
    let config = AcoConfig {
        max_group_size: 3,
        ..Default::default()
    };
    let engine = AcoEngine::in_memory(config, &geo_metadata()).unwrap();

    let villages = engine.villages();
    assert_eq!(villages.len(), 2);

    let mut sizes: Vec<usize> = villages.iter().map(Village::len).collect();
    sizes.sort();
    assert_eq!(sizes, vec![1, 3]);

    // A cross-village request still resolves: villages bound search cost,
    // not correctness
    let path = engine
        .find_path("address", &["country".to_string()])
        .unwrap();
    assert!(path.is_some());
}

/// Test: filter-column counters produce a single index recommendation
#[test]
fn test_filter_column_index_recommendation() {
    let views: Arc<MemoryRepository<MaterializedView>> = Arc::new(MemoryRepository::new());
    let indexes: Arc<MemoryRepository<IndexTracking>> = Arc::new(MemoryRepository::new());
    let requests: Arc<MemoryRepository<PathRequest>> = Arc::new(MemoryRepository::new());

    let config = AcoConfig {
        index_column_threshold: 5,
        ..Default::default()
    };
    let engine = AcoEngine::new(
        config,
        &geo_metadata(),
        Arc::new(UnitCostEstimator),
        requests,
        views,
        indexes.clone(),
    )
    .unwrap();

    let mut promoted = None;
    for _ in 0..8 {
        if let Some(name) = engine.record_filter("address", "postal_code") {
            promoted = Some(name);
        }
    }

    assert_eq!(promoted, Some("idx_address_postal_code".to_string()));
    assert_eq!(indexes.len(), 1);

    let index = indexes.get("idx_address_postal_code").unwrap().unwrap();
    assert_eq!(index.table_name, "address");
    assert_eq!(index.usage_count, 8);
}

/// Test: concurrent explorations reinforce the same edges without losing
/// the store's invariants
#[test]
fn test_concurrent_explorations() {
    let engine = Arc::new(AcoEngine::in_memory(AcoConfig::default(), &geo_metadata()).unwrap());

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let engine = Arc::clone(&engine);
            std::thread::spawn(move || {
                for _ in 0..25 {
                    engine
                        .find_path("address", &["country".to_string()])
                        .unwrap()
                        .unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let stats = engine.stats();
    assert_eq!(stats.store.edge_count, 3);
    for edge in engine.store().scan() {
        assert!(edge.pheromone.level() >= Pheromone::FLOOR);
    }
}

/// Test: a trail already past the transition-rule cap still registers
/// further traversals
#[test]
fn test_saturated_trail_still_accumulates() {
    let engine = AcoEngine::in_memory(AcoConfig::default(), &geo_metadata()).unwrap();
    let key = EdgeKey::new("address", "city");

    while engine.store().get(&key).unwrap().pheromone.level() < Pheromone::MAX {
        engine
            .find_path("address", &["city".to_string()])
            .unwrap()
            .unwrap();
    }

    let before = engine.store().get(&key).unwrap().pheromone.level();
    engine
        .find_path("address", &["city".to_string()])
        .unwrap()
        .unwrap();
    let after = engine.store().get(&key).unwrap().pheromone.level();
    assert!(after > before);
}

/// Test: a query spanning two disconnected schema islands reports no path
/// instead of failing
#[test]
fn test_no_path_is_non_fatal() {
    let mut metadata = geo_metadata();
    metadata.insert(
        "audit_log".to_string(),
        vec![FieldMeta::plain("id"), FieldMeta::plain("payload")],
    );

    let engine = AcoEngine::in_memory(AcoConfig::default(), &metadata).unwrap();
    let result = engine
        .find_path("address", &["audit_log".to_string()])
        .unwrap();
    assert!(result.is_none());
}

/// Test: persisted records carry the JSON shape the external housekeeping
/// job consumes
#[test]
fn test_records_serialize_for_housekeeping() {
    init_tracing();
    let views: Arc<MemoryRepository<MaterializedView>> = Arc::new(MemoryRepository::new());
    let indexes: Arc<MemoryRepository<IndexTracking>> = Arc::new(MemoryRepository::new());
    let requests: Arc<MemoryRepository<PathRequest>> = Arc::new(MemoryRepository::new());

    let config = AcoConfig {
        promotion_pheromone_threshold: 0.1,
        promotion_min_samples: 1,
        ..Default::default()
    };
    let engine = AcoEngine::new(
        config,
        &geo_metadata(),
        Arc::new(UnitCostEstimator),
        requests.clone(),
        views.clone(),
        indexes,
    )
    .unwrap();

    engine
        .find_path("address", &["country".to_string()])
        .unwrap()
        .unwrap();

    let (_, view) = views.scan().unwrap().into_iter().next().unwrap();
    let json = serde_json::to_value(&view).unwrap();
    assert_eq!(json["view_name"], "mv_address_city_region_country");
    assert!(json["definition"]
        .as_str()
        .unwrap()
        .starts_with("SELECT * FROM address"));
    assert!(json["usage_count"].as_u64().unwrap() >= 1);

    let (_, request) = requests.scan().unwrap().into_iter().next().unwrap();
    let json = serde_json::to_value(&request).unwrap();
    assert_eq!(json["cost"], 3.0);
    assert_eq!(json["materialized_view_created"], true);
    assert_eq!(json["path"].as_array().unwrap().len(), 3);
}

/// Test: multi-target request touches every requested resource
#[test]
fn test_multi_target_exploration() {
    let engine = AcoEngine::in_memory(AcoConfig::default(), &geo_metadata()).unwrap();

    let path = engine
        .find_path(
            "address",
            &["region".to_string(), "country".to_string()],
        )
        .unwrap()
        .unwrap();

    assert!(path.nodes.contains(&"region".to_string()));
    assert!(path.nodes.contains(&"country".to_string()));
    assert_eq!(path.cost, 3.0);
}
