//! Sweep functions merged into complete matrices

use crate::matrix::{ParameterSpec, SpecSet};
use crate::model::ParamValue;
use crate::sweeps::{ModeToggle, PowerCurve, SeedSweep};

fn tip_clearance_specs() -> SpecSet {
    let mut specs = SpecSet::from_specs([
        ParameterSpec::constant("ElastoDyn", "PtfmSgDOF", "False", 0),
        ParameterSpec::constant("ServoDyn", "Ptch_Cntrl", 1, 0),
    ])
    .unwrap();
    specs
        .merge(&PowerCurve::new(vec![8.0, 10.0, 12.0], 300.0).with_full_run(true))
        .unwrap();
    specs
        .merge(&ModeToggle::new(
            "DISCON_in",
            "TCIPC_ControlMode",
            vec![0.into(), 1.into()],
        ))
        .unwrap();
    specs.merge(&SeedSweep::new(3, 7)).unwrap();
    specs
}

/// Case count is the product of group sizes and every case assigns every spec
#[test]
fn test_combined_sweeps_cover_cross_product() {
    let specs = tip_clearance_specs();
    let matrix = specs.build().unwrap();

    // groups: constants(1) x wind(3) x wind constants(1) x toggle(2) x seeds(3)
    assert_eq!(matrix.shape(), &[1, 3, 1, 2, 3]);
    assert_eq!(matrix.len(), 18);
    for (i, case) in matrix.iter().enumerate() {
        assert_eq!(case.index.0, i, "indices are contiguous");
        assert_eq!(case.assignments.len(), specs.len());
    }
}

/// Seeds vary fastest, the first sweep slowest
#[test]
fn test_last_merged_sweep_varies_fastest() {
    let matrix = tip_clearance_specs().build().unwrap();
    let cases = matrix.cases();

    let seed = |i: usize| cases[i].get("TurbSim", "RandSeed1").cloned();
    let wind = |i: usize| cases[i].get("InflowWind", "HWindSpeed").cloned();
    let mode = |i: usize| cases[i].get("DISCON_in", "TCIPC_ControlMode").cloned();

    assert_ne!(seed(0), seed(1));
    assert_eq!(mode(0), mode(2));
    assert_ne!(mode(0), mode(3));
    assert_eq!(wind(0), wind(5));
    assert_eq!(wind(6), Some(ParamValue::Float(10.0)));
    // The seed list repeats for every (wind, mode) combination
    assert_eq!(seed(0), seed(3));
}

/// Same input order gives the same sequence, seeds included
#[test]
fn test_build_is_deterministic() {
    let a = tip_clearance_specs().build().unwrap();
    let b = tip_clearance_specs().build().unwrap();
    assert_eq!(a, b);
    assert_eq!(a.to_yaml().unwrap(), b.to_yaml().unwrap());
}

/// Constants shared by all cases survive into every materialized input
#[test]
fn test_materialized_inputs_keep_constants() {
    let base = crate::model::SimulationInput::new()
        .with("DISCON_in", "TCIPC_MaxTipDeflection", 10)
        .with("ServoDyn", "Ptch_Cntrl", 0);
    let matrix = tip_clearance_specs().build().unwrap();

    for case in &matrix {
        let input = case.materialize(&base);
        let get = |t: &str, f: &str| input.get(&crate::model::ParamKey::new(t, f)).cloned();
        assert_eq!(get("DISCON_in", "TCIPC_MaxTipDeflection"), Some(ParamValue::Int(10)));
        assert_eq!(get("ServoDyn", "Ptch_Cntrl"), Some(ParamValue::Int(1)));
        assert_eq!(get("Fst", "TMax"), Some(ParamValue::Float(300.0)));
    }
}
