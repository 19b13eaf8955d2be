use std::collections::BTreeMap;

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, TimeZone, Utc};
use floodrisk::{
    assess_locations, top_n, Config, DrynessOutcome, ElementKind, Error, Feature, FeatureProvider, FeatureQuery,
    GeoMetricsExtractor, HazardScorer, HourlyRequest, HourlyTable, HydroProvider, Location, LonLat, NamedVulnerability,
    PrecipRequest, PrecipitationProvider, PrecipitationSeries, RiskLevel, RiskRecord, Today, VulnerabilityAssessor,
    EVAPOTRANSPIRATION, SOIL_MOISTURE,
};

const LAT: f64 = -29.918;
const LON: f64 = -51.185;

struct Features(Vec<Feature>);

impl FeatureProvider for Features {
    fn features(&self, _: &FeatureQuery) -> floodrisk::Result<Vec<Feature>> { Ok(self.0.clone()) }
}

struct Hydro(HourlyTable);

impl HydroProvider for Hydro {
    fn hourly(&self, _: &HourlyRequest) -> floodrisk::Result<HourlyTable> { Ok(self.0.clone()) }
}

/// Flat rate precipitation on the requested hourly grid.
struct Drizzle(f64);

impl PrecipitationProvider for Drizzle {
    fn precipitation(&self, request: &PrecipRequest) -> floodrisk::Result<PrecipitationSeries> {
        let hours = (request.end - request.start).num_hours();
        let samples: Vec<(DateTime<Utc>, f64)> = (0..=hours)
            .map(|h| (request.start + Duration::hours(h), self.0))
            .collect();
        Ok(PrecipitationSeries::on_grid(&samples, request.start, request.end, request.step()))
    }
}

fn way(tags: &[(&str, &str)], coords: &[(f64, f64)]) -> Feature {
    Feature {
        kind: ElementKind::Way,
        id: 1,
        tags: tags.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
        coords: coords.iter().map(|&(lon, lat)| LonLat { lon, lat }).collect(),
    }
}

fn node(tags: &[(&str, &str)], lon: f64, lat: f64) -> Feature {
    Feature { kind: ElementKind::Node, coords: vec![LonLat { lon, lat }], ..way(tags, &[]) }
}

fn neighbourhood() -> Vec<Feature> {
    let d = 0.002;
    vec![
        way(&[("highway", "residential"), ("surface", "asphalt")], &[(LON - 0.05, LAT), (LON + 0.05, LAT)]),
        way(&[("highway", "residential"), ("surface", "paved")], &[(LON, LAT - 0.05), (LON, LAT + 0.05)]),
        way(&[("waterway", "ditch")], &[(LON - 0.003, LAT + 0.003), (LON + 0.003, LAT + 0.003)]),
        way(&[("leisure", "park")], &[(LON - d, LAT - d), (LON + d, LAT - d), (LON + d, LAT + d), (LON - d, LAT + d), (LON - d, LAT - d)]),
        node(&[("man_made", "pumping_station")], LON + 0.001, LAT + 0.001),
    ]
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate { NaiveDate::from_ymd_opt(y, m, d).unwrap() }

/// One local day (UTC-3) of dry conditions: high ET, low soil moisture.
fn dry_day(day: NaiveDate) -> HourlyTable {
    let start = Utc.from_utc_datetime(&day.and_hms_opt(3, 0, 0).unwrap());
    let times = (0..24).map(|h| start + Duration::hours(h)).collect();
    let columns = BTreeMap::from([
        (EVAPOTRANSPIRATION.to_string(), vec![Some(0.3); 24]),
        (SOIL_MOISTURE.to_string(), vec![Some(0.08); 24]),
    ]);
    HourlyTable::new(FixedOffset::west_opt(3 * 3600).unwrap(), times, columns).unwrap()
}

#[test]
fn extraction_over_synthetic_neighbourhood() {
    let config = Config::default();
    let extractor = GeoMetricsExtractor::new(Features(neighbourhood()), &config.buffer).unwrap();
    let m = extractor.extract(&Location::new(LAT, LON, 1.0).unwrap()).unwrap();

    // Two roads crossing the whole 1 km disk.
    assert!((m.paved_km - 4.0).abs() < 0.05, "paved {}", m.paved_km);
    assert!(m.drain_km > 0.5 && m.drain_km < 0.6, "drain {}", m.drain_km);
    assert_eq!(m.canal_km, 0.0);
    assert!(m.green_km2 > 0.1 && m.green_km2 < 0.2, "green {}", m.green_km2);
    assert_eq!(m.pumps_n, 1);
}

#[test]
fn assessment_applies_dryness_inside_window() {
    let config = Config::default();
    let day = date(2024, 5, 1);
    let assessor = VulnerabilityAssessor::new(Features(neighbourhood()), Hydro(dry_day(day)), &config).unwrap();

    let report = assessor.assess(&Location::new(LAT, LON, 1.0).unwrap(), Some(day), day).unwrap();
    assert!((0.0..=1.0).contains(&report.u_static));
    assert!((report.weights.sum() - 1.0).abs() < 1e-9);

    match report.dryness {
        DrynessOutcome::Applied { signal, delta, .. } => {
            // et24 = 7.2 mm, sm6 = 0.08: as dry as it gets.
            assert_eq!(signal.dryness, 1.0);
            assert_eq!(delta, 0.10);
        }
        other => panic!("expected applied dryness, got {other:?}"),
    }
    let u_t = report.u_t.unwrap();
    assert!((u_t - (report.u_static + 0.05).min(1.0)).abs() < 1e-12);
    assert!((report.fragility - (1.0 - u_t)).abs() < 1e-12);
}

#[test]
fn assessment_falls_back_outside_window() {
    let config = Config::default();
    let assessor = VulnerabilityAssessor::new(Features(neighbourhood()), Hydro(dry_day(date(2024, 5, 1))), &config).unwrap();

    let report = assessor
        .assess(&Location::new(LAT, LON, 1.0).unwrap(), Some(date(2023, 1, 1)), date(2024, 5, 1))
        .unwrap();
    assert!(matches!(report.dryness, DrynessOutcome::NotComputable { .. }));
    assert_eq!(report.u_t, None);
    assert_eq!(report.u(), report.u_static);
    assert!((report.fragility - (1.0 - report.u_static)).abs() < 1e-12);
}

#[test]
fn assessment_falls_back_when_series_missing() {
    let config = Config::default();
    let day = date(2024, 5, 1);
    // Table covers the day before only, so et24 has nothing to sum.
    let assessor = VulnerabilityAssessor::new(Features(vec![]), Hydro(dry_day(date(2024, 4, 30))), &config).unwrap();

    let report = assessor.assess(&Location::new(LAT, LON, 2.0).unwrap(), Some(day), day).unwrap();
    assert!(matches!(report.dryness, DrynessOutcome::NotComputable { .. }));
    assert_eq!(report.u_static, 0.0);

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["dryness"]["status"], "not_computable");
}

#[test]
fn assessment_resolves_today_in_provider_offset() {
    let config = Config::default();
    let day = date(2024, 5, 1);
    let assessor = VulnerabilityAssessor::new(Features(neighbourhood()), Hydro(dry_day(day)), &config).unwrap();
    let location = Location::new(LAT, LON, 1.0).unwrap();

    // 02:00 UTC on May 4th is May 3rd at UTC-3, so May 1st is two days back.
    let now = Utc.with_ymd_and_hms(2024, 5, 4, 2, 0, 0).unwrap();
    let report = assessor.assess(&location, Some(day), Today::ProviderLocal(now)).unwrap();
    assert!(matches!(report.dryness, DrynessOutcome::Applied { .. }));

    // Judged by the UTC calendar date the same target falls outside the window.
    let report = assessor.assess(&location, Some(day), now.date_naive()).unwrap();
    assert!(matches!(report.dryness, DrynessOutcome::NotComputable { .. }));
}

#[test]
fn invalid_location_is_rejected() {
    assert!(matches!(Location::new(LAT, LON, -1.0), Err(Error::Validation(_))));
}

#[test]
fn hazard_from_steady_drizzle() {
    let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    let config = Config::default();
    let results = HazardScorer::new(Drizzle(1.0), &config.hazard)
        .score(LAT, LON, t0, &config.hazard.horizons)
        .unwrap();

    assert_eq!(results.len(), 4);
    for r in &results {
        assert_eq!(r.ant24h_mm, 25.0);
        assert_eq!(r.ant24h_pct, 1.0);
        assert_eq!(r.peak6h_mm, 6.0);
        assert!((r.h_score - (0.5 * r.peak6h_pct + 0.5)).abs() < 1e-12);
    }
}

#[test]
fn ranking_end_to_end() {
    let config = Config::default();
    let locations = vec![
        NamedVulnerability { name: "a".into(), u_static: Some(0.1), u_t: None },
        NamedVulnerability { name: "b".into(), u_static: Some(0.0), u_t: None },
        NamedVulnerability { name: "c".into(), u_static: Some(0.5), u_t: None },
        NamedVulnerability { name: "d".into(), u_static: Some(0.5), u_t: Some(0.3) },
    ];
    let risks = assess_locations(1.0, &locations, &config.thresholds);
    assert_eq!(risks[1].record.risk_level, RiskLevel::NoData);

    let top = top_n(&risks, 3);
    assert_eq!(top.iter().map(|r| r.name.as_str()).collect::<Vec<_>>(), vec!["a", "d", "c"]);
    assert_eq!(top[0].record.risk_level, RiskLevel::Red);
    assert_eq!(top[2].record.risk_level, RiskLevel::Yellow);

    let single = RiskRecord::combine(0.8, Some(0.4), &config.thresholds);
    assert_eq!(single.risk_level, RiskLevel::Yellow);
}
