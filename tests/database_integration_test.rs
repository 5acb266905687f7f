use chargemap_ingest::db::models::ExportResult;
use chargemap_ingest::db::Repository;
use chargemap_ingest::loader::parse_records;
use chargemap_ingest::models::NormalizedStation;
use chargemap_ingest::normalize::Normalizer;
use sqlx::PgPool;

fn stations(json: &str) -> Vec<NormalizedStation> {
    let records = parse_records(json).expect("Parse failed");
    Normalizer::normalize(&records).0
}

/// Test exporting normalized stations into the stations table
#[sqlx::test]
async fn test_insert_stations(pool: PgPool) {
    let repo = Repository::new(pool.clone());

    let stations = stations(
        r#"[
            {"ID": 1, "Nome": "A", "Cidade": "lisbon", "Latitude": 38.7, "Longitude": -9.1, "Número de Pontos": 2, "Potência Total (kW)": 44},
            {"ID": 2, "Nome": "B", "Latitude": 41.1, "Longitude": -8.6}
        ]"#,
    );

    let result = repo.insert_stations(&stations).await.expect("Insert failed");
    assert_eq!(result, ExportResult { inserted: 2, skipped: 0 });
    assert_eq!(repo.count_stations().await.unwrap(), 2);

    let row = repo
        .get_station(1)
        .await
        .expect("Fetch failed")
        .expect("Station 1 missing");
    assert_eq!(row.city, "Lisboa");
    assert_eq!(row.number_of_points, Some(2));
    assert_eq!(row.power_per_point_kw, Some(22.0));
    assert_eq!(row.operator, None);

    let bare = repo.get_station(2).await.unwrap().unwrap();
    assert_eq!(bare.city, "Not specified");
    assert_eq!(bare.total_power_kw, None);
    assert_eq!(bare.power_per_point_kw, None);
}

/// Test existing IDs are skipped, never updated
#[sqlx::test]
async fn test_duplicate_ids_are_skipped(pool: PgPool) {
    let repo = Repository::new(pool.clone());

    let original = stations(r#"[{"ID": 7, "Nome": "Original", "Latitude": 38.0, "Longitude": -9.0}]"#);
    repo.insert_stations(&original).await.expect("Insert failed");

    let changed = stations(
        r#"[
            {"ID": 7, "Nome": "Changed", "Latitude": 39.0, "Longitude": -8.0},
            {"ID": 8, "Nome": "New", "Latitude": 40.0, "Longitude": -8.0}
        ]"#,
    );
    let result = repo.insert_stations(&changed).await.expect("Insert failed");

    assert_eq!(result.inserted, 1);
    assert_eq!(result.skipped, 1);

    let row = repo.get_station(7).await.unwrap().unwrap();
    assert_eq!(row.name.as_deref(), Some("Original"));
    assert_eq!(row.latitude, 38.0);
}

/// Test stations without an ID are kept by the normalizer but not exported
#[sqlx::test]
async fn test_stations_without_id_are_skipped(pool: PgPool) {
    let repo = Repository::new(pool.clone());

    let stations = stations(
        r#"[
            {"ID": 1, "Nome": "Keyed", "Latitude": 38.7, "Longitude": -9.1},
            {"Nome": "No ID", "Latitude": 41.1, "Longitude": -8.6},
            {"ID": "abc", "Nome": "Bad ID", "Latitude": 40.2, "Longitude": -8.4}
        ]"#,
    );
    assert_eq!(stations.len(), 3);

    let result = repo.insert_stations(&stations).await.expect("Insert failed");
    assert_eq!(result, ExportResult { inserted: 1, skipped: 2 });
    assert_eq!(repo.count_stations().await.unwrap(), 1);

    let only_unkeyed = &stations[1..];
    let result = repo.insert_stations(only_unkeyed).await.expect("Insert failed");
    assert_eq!(result, ExportResult { inserted: 0, skipped: 2 });
}

/// Test exporting nothing is a no-op
#[sqlx::test]
async fn test_insert_empty(pool: PgPool) {
    let repo = Repository::new(pool.clone());

    let result = repo.insert_stations(&[]).await.expect("Insert failed");
    assert_eq!(result, ExportResult::default());
    assert_eq!(repo.count_stations().await.unwrap(), 0);
    assert!(repo.get_station(1).await.unwrap().is_none());
}
