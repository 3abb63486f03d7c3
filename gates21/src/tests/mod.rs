//!
//! # Unit Tests
//!

// Crates.io
use rand::rngs::StdRng;
use rand::SeedableRng;

// Local imports
use crate::coords::DbUnits;
use crate::cost::abut;
use crate::error::LayoutResult;
use crate::gen::{CellGenerator, CellParams};
use crate::model::{InstKey, InstKind, InstRole, PlaceModel};
use crate::placer::{apply_permutation, Placer, PlacerConfig};
use crate::route::{Record, RecordingSink};
use crate::ser::{SerdeFile, SerializationFormat};
use crate::tech::Tech;
use crate::validate::{check_abutment, check_tie_spacing};
use crate::welltie::WellTieInserter;

use samples::{order_cost, swap_order, SampleCells, SampleParams, SampleTechs};

/// Permutation cap above 10!, so that searches over up to ten instances always complete
const NO_CAP: usize = 10_000_000;

/// Pruned configuration, without a practical cap
fn pruned() -> PlacerConfig {
    PlacerConfig {
        max_perms: NO_CAP,
        ..Default::default()
    }
}
/// Unpruned configuration, without a practical cap
fn unpruned() -> PlacerConfig {
    PlacerConfig {
        prune: false,
        ..pruned()
    }
}

/// Lowest cost over every ordering of `group`, with the first-visited ordering winning ties
fn brute_force(model: &PlaceModel, group: &[InstKey]) -> LayoutResult<(DbUnits, Vec<InstKey>)> {
    let mut best: Option<(DbUnits, Vec<InstKey>)> = None;
    for perm in swap_order(group.len()) {
        let order = apply_permutation(group, &perm)?;
        let cost = order_cost(model, &order)?;
        if best.as_ref().map(|(b, _)| cost < *b).unwrap_or(true) {
            best = Some((cost, order));
        }
    }
    Ok(best.unwrap())
}

#[test]
fn search_matches_brute_force() -> LayoutResult<()> {
    let mut rng = StdRng::seed_from_u64(21);
    for k in 1..=8 {
        for _ in 0..3 {
            let (model, insts) = SampleCells::random(&mut rng, k, k, 20)?;
            let (want, _) = brute_force(&model, &insts)?;
            let mut placer = Placer::new(&model, pruned())?;
            let result = placer.search(&insts, DbUnits(0))?;
            assert_eq!(result.cost, want, "k = {}", k);
            assert_eq!(order_cost(&model, &result.order)?, want);
            assert!(!result.capped);
        }
    }
    Ok(())
}

#[test]
fn pruning_is_sound() -> LayoutResult<()> {
    let mut rng = StdRng::seed_from_u64(1234);
    for k in 2..=8 {
        for _ in 0..2 {
            let (model, insts) = SampleCells::random(&mut rng, k, k + 2, 12)?;
            let with = Placer::new(&model, pruned())?.search(&insts, DbUnits(0))?;
            let full = Placer::new(&model, unpruned())?.search(&insts, DbUnits(0))?;
            assert_eq!(with.cost, full.cost);
            assert_eq!(with.order, full.order);
            assert!(with.perms_evaluated <= full.perms_evaluated);
            // Unpruned visits every ordering
            assert_eq!(full.perms_evaluated, (1..=k).product::<usize>());
        }
    }
    Ok(())
}

/// Nine- and ten-instance groups. Full enumeration takes a while in debug builds.
#[test]
#[ignore]
fn pruning_is_sound_large() -> LayoutResult<()> {
    let mut rng = StdRng::seed_from_u64(910);
    for k in 9..=10 {
        let (model, insts) = SampleCells::random(&mut rng, k, k + 2, 12)?;
        let with = Placer::new(&model, pruned())?.search(&insts, DbUnits(0))?;
        let full = Placer::new(&model, unpruned())?.search(&insts, DbUnits(0))?;
        assert_eq!(with.cost, full.cost, "k = {}", k);
        assert_eq!(with.order, full.order);
        assert!(with.perms_evaluated <= full.perms_evaluated);
        assert_eq!(full.perms_evaluated, (1..=k).product::<usize>());
        assert!(!full.capped);
    }
    Ok(())
}

#[test]
fn unpruned_ties_keep_first_found() -> LayoutResult<()> {
    let mut rng = StdRng::seed_from_u64(99);
    for k in 2..=6 {
        let (model, insts) = SampleCells::random(&mut rng, k, k, 8)?;
        let (cost, order) = brute_force(&model, &insts)?;
        let result = Placer::new(&model, unpruned())?.search(&insts, DbUnits(0))?;
        assert_eq!(result.cost, cost);
        assert_eq!(result.order, order);
    }
    Ok(())
}

#[test]
fn capped_search() -> LayoutResult<()> {
    let mut rng = StdRng::seed_from_u64(5);
    let (model, insts) = SampleCells::random(&mut rng, 6, 6, 20)?;
    let config = PlacerConfig {
        max_perms: 5,
        ..unpruned()
    };
    let result = Placer::new(&model, config)?.search(&insts, DbUnits(0))?;
    assert_eq!(result.perms_evaluated, 5);
    assert!(result.capped);

    // Best of the first five orderings visited
    let mut best: Option<(DbUnits, Vec<InstKey>)> = None;
    for perm in swap_order(6).into_iter().take(5) {
        let order = apply_permutation(&insts, &perm)?;
        let cost = order_cost(&model, &order)?;
        if best.as_ref().map(|(b, _)| cost < *b).unwrap_or(true) {
            best = Some((cost, order));
        }
    }
    let (cost, order) = best.unwrap();
    assert_eq!(result.cost, cost);
    assert_eq!(result.order, order);
    Ok(())
}

#[test]
fn search_beats_heuristic() -> LayoutResult<()> {
    let mut rng = StdRng::seed_from_u64(77);
    for _ in 0..20 {
        let (model, _) = SampleCells::random(&mut rng, 7, 8, 30)?;
        let heuristic = Placer::place(
            &model,
            PlacerConfig {
                exhaustive: false,
                ..Default::default()
            },
        )?;
        let searched = Placer::place(&model, PlacerConfig::default())?;
        assert!(searched.cost <= heuristic.cost);
        assert_eq!(searched.right_full_x, heuristic.right_full_x);
        // Both are abutted rows
        check_abutment(&model, &heuristic.order, &heuristic.positions)?;
        check_abutment(&model, &searched.order, &searched.positions)?;
        assert_eq!(model.cost(&searched.positions)?, searched.cost);
    }
    Ok(())
}

#[test]
fn placement_regions() -> LayoutResult<()> {
    let mut rng = StdRng::seed_from_u64(3);
    let (model, insts) = SampleCells::random(&mut rng, 8, 6, 30)?;
    let placed = Placer::place(&model, PlacerConfig::default())?;
    assert_eq!(placed.order.len(), insts.len());
    // Full-height instances first, then NMOS-only, then PMOS-only
    let rank = |k: &InstKey| match model.insts[*k].kind {
        InstKind::PN => 0,
        InstKind::N => 1,
        InstKind::P => 2,
    };
    let ranks: Vec<i32> = placed.order.iter().map(rank).collect();
    let mut sorted = ranks.clone();
    sorted.sort();
    assert_eq!(ranks, sorted);
    // Every single-lane instance sits right of every full-height one
    for key in placed.order.iter() {
        let x = placed.positions[*key];
        match model.insts[*key].kind {
            InstKind::PN => assert!(x + model.insts[*key].width <= placed.right_full_x),
            _ => assert!(x >= placed.right_full_x),
        }
        assert_eq!(placed.loc(*key).map(|l| l.row), Some(0));
    }
    Ok(())
}

#[test]
fn placement_is_deterministic() -> LayoutResult<()> {
    let (model, _) = SampleCells::random(&mut StdRng::seed_from_u64(11), 8, 10, 25)?;
    let a = Placer::place(&model, PlacerConfig::default())?;
    let b = Placer::place(&model, PlacerConfig::default())?;
    assert_eq!(a.order, b.order);
    assert_eq!(a.positions, b.positions);
    assert_eq!(a.cost, b.cost);
    Ok(())
}

#[test]
fn random_rows_get_tied() -> LayoutResult<()> {
    let mut tech = SampleTechs::mocmos()?;
    tech.well_tie_pitch = DbUnits(100);
    tech.well_tie_width = DbUnits(6);
    let mut rng = StdRng::seed_from_u64(42);
    for size in 1..30 {
        let (mut model, _) = SampleCells::random(&mut rng, size, 0, 100)?;
        let placed = Placer::place(
            &model,
            PlacerConfig {
                exhaustive: false,
                ..Default::default()
            },
        )?;
        let ties = WellTieInserter::new(&tech).insert(&mut model, &placed.order)?;
        let (positions, _) = abut(&model, &ties.order, DbUnits(0))?;
        check_abutment(&model, &ties.order, &positions)?;
        check_tie_spacing(&model, &ties.order, &positions, tech.well_tie_pitch)?;
        // Devices keep their relative order
        let devices: Vec<InstKey> = ties
            .order
            .iter()
            .copied()
            .filter(|k| model.insts[*k].role == InstRole::Device)
            .collect();
        assert_eq!(devices, placed.order);
        assert_eq!(ties.order.len(), placed.order.len() + ties.inserted.len());
    }
    Ok(())
}

#[test]
fn generate_nand2() -> LayoutResult<()> {
    let tech = SampleTechs::mocmos()?;
    let params = SampleParams::mocmos()?;
    let (mut model, layers) = SampleCells::nand2()?;
    let mut sink = RecordingSink::new();
    let cell = CellGenerator::new(&tech, params).generate(&mut model, &layers, &mut sink)?;

    // Both lanes get one tie at the row end
    assert_eq!(cell.ties.inserted.len(), 2);
    check_abutment(&model, &cell.placement.order, &cell.placement.positions)?;
    assert_eq!(cell.placement.right_full_x, DbUnits(0));

    // Rails, then `out`, `a`, `b`, `mid`
    let names: Vec<&str> = cell.tracks.iter().map(|t| t.net.as_str()).collect();
    assert_eq!(names, vec!["vdd", "gnd", "out", "a", "b", "mid"]);
    assert_eq!(cell.tracks[0].ports, 3);
    assert_eq!(cell.tracks[1].ports, 2);
    // `mid` only touches NMOS devices
    let mid = &cell.tracks[5];
    assert!(mid.index.map(|i| i < 0).unwrap_or(false));
    assert!(mid.y < DbUnits(0));

    // One connected component per routed track, nothing left hanging
    assert_eq!(sink.components(), cell.tracks.len());
    assert!(sink.dangling().is_empty());
    // Gates come up through poly-capable ports, but land on metal-1
    assert!(sink
        .nodes
        .values()
        .all(|n| !n.has_layer(crate::tech::Layer::Poly)));
    Ok(())
}

#[test]
fn generate_is_deterministic() -> LayoutResult<()> {
    let tech = SampleTechs::mocmos()?;
    let run = || -> LayoutResult<(Vec<String>, Vec<Record>, RecordingSink)> {
        let (mut model, layers) = SampleCells::nand2()?;
        let mut sink = RecordingSink::new();
        let cell = CellGenerator::new(&tech, SampleParams::mocmos()?).generate(&mut model, &layers, &mut sink)?;
        let names = cell
            .placement
            .order
            .iter()
            .map(|k| model.insts[*k].name.clone())
            .collect();
        Ok((names, sink.log.clone(), sink))
    };
    let (names1, log1, sink1) = run()?;
    let (names2, log2, sink2) = run()?;
    assert_eq!(names1, names2);
    assert_eq!(log1, log2);
    let nodes1: Vec<_> = sink1.nodes.values().cloned().collect();
    let nodes2: Vec<_> = sink2.nodes.values().cloned().collect();
    assert_eq!(nodes1, nodes2);
    Ok(())
}

#[test]
fn generate_out_of_tracks() -> LayoutResult<()> {
    let tech = SampleTechs::mocmos()?;
    let mut params = SampleParams::mocmos()?;
    // Reserve everything but the innermost track on each side
    params.reserved.push(crate::alloc::Blockage::new(250, 200));
    params.reserved.push(crate::alloc::Blockage::new(-250, 200));
    let (mut model, layers) = SampleCells::nand2()?;
    let mut sink = RecordingSink::new();
    let result = CellGenerator::new(&tech, params).generate(&mut model, &layers, &mut sink);
    assert!(matches!(result, Err(crate::error::LayoutError::OutOfTracks(_))));
    Ok(())
}

#[test]
fn config_files() -> LayoutResult<()> {
    let dir = std::env::temp_dir();
    let tech = SampleTechs::mocmos()?;
    let params = SampleParams::mocmos()?;
    for (ext, fmt) in [
        ("yaml", SerializationFormat::Yaml),
        ("json", SerializationFormat::Json),
        ("toml", SerializationFormat::Toml),
    ] {
        let tpath = dir.join(format!("gates21_tech_{}.{}", std::process::id(), ext));
        tech.save(fmt, &tpath)?;
        assert_eq!(Tech::load(&tpath)?, tech);
        assert_eq!(Tech::open(&tpath, fmt)?, tech);

        let ppath = dir.join(format!("gates21_params_{}.{}", std::process::id(), ext));
        params.save(fmt, &ppath)?;
        assert_eq!(CellParams::load(&ppath)?, params);

        std::fs::remove_file(&tpath).map_err(|e| crate::error::LayoutError::Boxed(Box::new(e)))?;
        std::fs::remove_file(&ppath).map_err(|e| crate::error::LayoutError::Boxed(Box::new(e)))?;
    }
    assert!(Tech::load(dir.join("gates21_tech.gds")).is_err());
    Ok(())
}

#[test]
fn params_yaml_defaults() -> LayoutResult<()> {
    let params: CellParams = SerializationFormat::Yaml.from_str(
        r#"
        nmos_well_height: 490
        pmos_well_height: 490
        vdd_y: 430
        vdd_width: 60
        gnd_y: -430
        gnd_width: 60
        pmos_track_offset: 35
        nmos_track_offset: -35
        "#,
    )?;
    assert_eq!(params.vdd_name, "vdd");
    assert_eq!(params.gnd_name, "gnd");
    assert!(params.exhaustive);
    assert!(params.reserved.is_empty());
    params.validate()
}
