//! End-to-end annotation through the instrument dispatcher.

use approx::assert_abs_diff_eq;
use photon_spectrify::{
    spectrify, x1d_epera_solution, Column, EventTable, Header, MetadataValue, OrderTable,
    SpectralOrder, SpectrifyConfig, SpectrifyError, TraceLocation,
};

const ROOTNAME: &str = "o5ko01010";

fn unit_flux(w: &[f64], _: Option<&[usize]>) -> photon_spectrify::Result<Vec<f64>> {
    Ok(vec![1.0; w.len()])
}

fn text(s: &str) -> MetadataValue {
    MetadataValue::String(s.into())
}

fn stis_order(sporder: i64, trace: f64, wave0: f64) -> SpectralOrder {
    SpectralOrder {
        sporder,
        segment: None,
        extrlocy: vec![trace; 1024],
        wavelength: (0..1024).map(|k| wave0 + 0.02 * k as f64).collect(),
        dq: Some(vec![0; 1024]),
        flux: Some(vec![1e-14; 1024]),
        net: Some(vec![0.5; 1024]),
    }
}

fn stis_orders(orders: Vec<SpectralOrder>) -> OrderTable {
    OrderTable {
        header: Header::new()
            .with("ROOTNAME", text(ROOTNAME))
            .with("INSTRUME", text("STIS"))
            .with("SIZAXIS1", MetadataValue::Integer(1024))
            .with("SIZAXIS2", MetadataValue::Integer(1024)),
        orders,
    }
}

fn stis_events(x: &[f64], y: &[f64]) -> EventTable {
    EventTable::new(
        Header::new()
            .with("ROOTNAME", text(ROOTNAME))
            .with("TSCAL1", MetadataValue::Float(0.125))
            .with("AXLEN1", MetadataValue::Integer(1024))
            .with("AXLEN2", MetadataValue::Integer(1024)),
    )
    .with_column(
        "time",
        Column::Int((0..x.len() as i64).map(|t| Some(t * 8)).collect()),
    )
    .unwrap()
    .with_column("axis1", Column::Float(x.to_vec()))
    .unwrap()
    .with_column("axis2", Column::Float(y.to_vec()))
    .unwrap()
}

fn floats<'a>(table: &'a EventTable, name: &str) -> &'a [f64] {
    match table.column(name) {
        Some(Column::Float(v)) => v,
        other => panic!("column {name}: {other:?}"),
    }
}

fn ints<'a>(table: &'a EventTable, name: &str) -> &'a [Option<i64>] {
    match table.column(name) {
        Some(Column::Int(v)) => v,
        other => panic!("column {name}: {other:?}"),
    }
}

#[test]
fn stis_single_order_keeps_rows_and_order() {
    let x: Vec<f64> = (0..200).map(|i| (i * 5 % 1000) as f64 + 10.0).collect();
    let y: Vec<f64> = (0..200).map(|i| 400.0 + (i % 21) as f64 - 10.0).collect();
    let events = stis_events(&x, &y);
    let orders = stis_orders(vec![stis_order(1, 400.0, 1500.0)]);
    let flux = x1d_epera_solution(&orders).unwrap();

    let out = spectrify(&events, &orders, &flux, &SpectrifyConfig::default()).unwrap();

    assert_eq!(out.len(), events.len());
    assert_eq!(floats(&out, "axis1"), x.as_slice());
    assert!(ints(&out, "order").iter().all(|o| *o == Some(1)));
    assert!(!out.header.contains("TSCAL1"));
    assert_eq!(floats(&out, "time")[1], 1.0);

    // dequantization moves each photon by less than two pixels
    let xdisp = floats(&out, "xdisp");
    for (yi, d) in y.iter().zip(xdisp) {
        let cell = (yi / 2.0).floor() * 2.0;
        assert!(*d >= cell - 400.0 - 1e-9 && *d < cell + 2.0 - 400.0);
    }
    // epera = flux * dλ / net on a uniform grid
    for e in floats(&out, "epera") {
        assert_abs_diff_eq!(*e, 1e-14 * 0.02 / 0.5, epsilon = 1e-20);
    }
}

#[test]
fn stis_runs_are_bit_identical() {
    let x: Vec<f64> = (0..500).map(|i| (i * 37 % 1000) as f64).collect();
    let y: Vec<f64> = (0..500).map(|i| 300.0 + (i % 9) as f64).collect();
    let events = stis_events(&x, &y);
    let orders = stis_orders(vec![stis_order(3, 300.0, 2000.0)]);
    let config = SpectrifyConfig::default();

    let a = spectrify(&events, &orders, &unit_flux, &config).unwrap();
    let b = spectrify(&events, &orders, &unit_flux, &config).unwrap();
    let bits = |t: &EventTable, c: &str| -> Vec<u64> {
        floats(t, c).iter().map(|v| v.to_bits()).collect()
    };
    assert_eq!(bits(&a, "xdisp"), bits(&b, "xdisp"));
    assert_eq!(bits(&a, "wavelength"), bits(&b, "wavelength"));
}

#[test]
fn stis_echelle_assigns_nearest_order() {
    let x = [100.0, 100.0, 500.0, 900.0];
    let y = [60.0, 140.0, 48.0, 152.0];
    let events = stis_events(&x, &y);
    let orders = stis_orders(vec![stis_order(80, 50.0, 1200.0), stis_order(79, 150.0, 1250.0)]);
    let flux = x1d_epera_solution(&orders).unwrap();

    let out = spectrify(&events, &orders, &flux, &SpectrifyConfig::default()).unwrap();

    assert_eq!(ints(&out, "order"), [Some(80), Some(79), Some(80), Some(79)]);
    let xdisp = floats(&out, "xdisp");
    assert!(xdisp[0] >= 10.0 && xdisp[0] < 12.0);
    assert!(xdisp[1] >= -10.0 && xdisp[1] < -8.0);
    let wave = floats(&out, "wavelength");
    assert!(wave[0] < 1250.0);
    assert!(wave[1] >= 1250.0);
}

#[test]
fn stis_echelle_rejects_median_trace() {
    let events = stis_events(&[10.0], &[60.0]);
    let orders = stis_orders(vec![stis_order(80, 50.0, 1200.0), stis_order(79, 150.0, 1250.0)]);
    let config = SpectrifyConfig {
        traceloc: TraceLocation::MedianTrend,
        ..SpectrifyConfig::default()
    };
    let err = spectrify(&events, &orders, &unit_flux, &config).unwrap_err();
    assert!(matches!(err, SpectrifyError::UnsupportedConfiguration(_)));
}

#[test]
fn stis_single_order_line_centroid() {
    // Lyman-alpha photons around y = 700 on top of a spread continuum.
    let order = SpectralOrder {
        wavelength: (0..1024).map(|k| 1200.0 + 0.03 * k as f64).collect(),
        ..stis_order(1, 512.0, 0.0)
    };
    let lya_x = (1215.67 - 1200.0) / 0.03;
    let mut x = Vec::new();
    let mut y = Vec::new();
    for i in 0..400 {
        x.push(lya_x + (i % 3) as f64);
        y.push(700.0 + (i % 5) as f64 * 2.0 - 4.0);
    }
    for i in 0..400 {
        x.push((i * 2) as f64);
        y.push((i * 7 % 1000) as f64);
    }
    let events = stis_events(&x, &y);
    let orders = stis_orders(vec![order]);
    let config = SpectrifyConfig {
        traceloc: TraceLocation::LineCentroid,
        ..SpectrifyConfig::default()
    };
    let out = spectrify(&events, &orders, &unit_flux, &config).unwrap();
    let xdisp = floats(&out, "xdisp");
    let lya_mean = xdisp[..400].iter().sum::<f64>() / 400.0;
    assert_abs_diff_eq!(lya_mean, 0.0, epsilon = 2.5);
}

fn cos_events(detector: &str, segment: &str, y: &[f64]) -> EventTable {
    let n = y.len();
    EventTable::new(
        Header::new()
            .with("ROOTNAME", text(ROOTNAME))
            .with("DETECTOR", text(detector))
            .with("SEGMENT", text(segment))
            .with("TALEN2", MetadataValue::Integer(16384))
            .with("TALEN3", MetadataValue::Integer(1024)),
    )
    .with_column("time", Column::Float((0..n).map(|i| i as f64 * 0.032).collect()))
    .unwrap()
    .with_column("xfull", Column::Float((0..n).map(|i| (i * 97 % 16384) as f64).collect()))
    .unwrap()
    .with_column("yfull", Column::Float(y.to_vec()))
    .unwrap()
    .with_column("wavelength", Column::Float(vec![1400.0; n]))
    .unwrap()
}

fn cos_orders(segments: &[&str]) -> OrderTable {
    OrderTable {
        header: Header::new()
            .with("ROOTNAME", text(ROOTNAME))
            .with("INSTRUME", text("COS"))
            .with("SP_LOC_A", MetadataValue::Float(50.0))
            .with("SP_OFF_A", MetadataValue::Float(0.0))
            .with("SP_LOC_B", MetadataValue::Float(150.0))
            .with("SP_OFF_B", MetadataValue::Float(0.0)),
        orders: segments
            .iter()
            .map(|s| SpectralOrder {
                sporder: 1,
                segment: Some(s.to_string()),
                extrlocy: Vec::new(),
                wavelength: vec![1300.0, 1500.0],
                dq: None,
                flux: Some(vec![2.0, 2.0]),
                net: Some(vec![1.0, 1.0]),
            })
            .collect(),
    }
}

#[test]
fn cos_nuv_assigns_nearest_trace() {
    let events = cos_events("NUV", "N/A", &[60.0, 140.0]);
    let orders = cos_orders(&["NUVA", "NUVB"]);
    let out = spectrify(&events, &orders, &unit_flux, &SpectrifyConfig::default()).unwrap();
    assert_eq!(ints(&out, "order"), [Some(0), Some(1)]);
    assert_eq!(floats(&out, "xdisp"), [10.0, -10.0]);
}

#[test]
fn cos_nuv_rejects_line_centroid() {
    let events = cos_events("NUV", "N/A", &[60.0]);
    let orders = cos_orders(&["NUVA", "NUVB"]);
    let config = SpectrifyConfig {
        traceloc: TraceLocation::LineCentroid,
        ..SpectrifyConfig::default()
    };
    let err = spectrify(&events, &orders, &unit_flux, &config).unwrap_err();
    assert!(matches!(err, SpectrifyError::UnsupportedConfiguration(_)));
}

#[test]
fn cos_fuv_calibrates_with_segment_row() {
    let events = cos_events("FUV", "FUVA", &[49.0, 51.0, 50.0]);
    let orders = cos_orders(&["FUVA", "FUVB"]);
    let flux = x1d_epera_solution(&orders).unwrap();
    let out = spectrify(&events, &orders, &flux, &SpectrifyConfig::default()).unwrap();
    assert_eq!(out.len(), 3);
    assert_eq!(ints(&out, "order"), [Some(0); 3]);
    assert_eq!(floats(&out, "xdisp"), [-1.0, 1.0, 0.0]);
    for e in floats(&out, "epera") {
        assert_abs_diff_eq!(*e, 2.0 * 200.0, epsilon = 1e-9);
    }
}

#[test]
fn mismatched_exposures_are_rejected() {
    let events = cos_events("FUV", "FUVA", &[50.0]);
    let mut orders = cos_orders(&["FUVA"]);
    orders.header.insert("ROOTNAME", text("lb4c01010"));
    let err = spectrify(&events, &orders, &unit_flux, &SpectrifyConfig::default()).unwrap_err();
    assert!(matches!(err, SpectrifyError::Consistency(_)));
}
