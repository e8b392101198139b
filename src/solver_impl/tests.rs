//! Tests for the FCI solver

use super::solver::pspace_guesses;
use super::*;
use crate::cistring_impl::FciSpace;
use crate::contract_impl::energy;
use crate::error::FciError;
use crate::integrals::Integrals;
use crate::tensor::Eri;
use crate::testing::{
    brute_force_hamiltonian, random_restricted, random_unrestricted, sorted_eigenvalues,
};
use nalgebra::DMatrix;

/// H2 in a minimal basis at 1.4 bohr, molecular-orbital integrals.
fn h2_minimal() -> Integrals {
    let (j11, j22, j12, k12) = (0.6746, 0.6975, 0.6636, 0.1813);
    let h1e = DMatrix::from_row_slice(2, 2, &[-1.2528, 0.0, 0.0, -0.4756]);
    let eri = Eri::from_fn(2, |p, q, r, s| {
        if p == q && r == s {
            match (p, r) {
                (0, 0) => j11,
                (1, 1) => j22,
                _ => j12,
            }
        } else if p != q && r != s {
            k12
        } else {
            0.0
        }
    });
    Integrals::restricted(h1e, eri).unwrap()
}

/// Lowest root of the closed-shell 2x2 block `{|1a 1b>, |2a 2b>}`.
fn h2_ground_state() -> f64 {
    let a: f64 = 2.0 * -1.2528 + 0.6746;
    let b: f64 = 2.0 * -0.4756 + 0.6975;
    let k: f64 = 0.1813;
    0.5 * (a + b) - ((0.5 * (a - b)).powi(2) + k * k).sqrt()
}

fn config(spin: SpinVariant, pspace_size: usize) -> SolverConfig {
    SolverConfig {
        conv_tol: 1e-12,
        pspace_size,
        spin,
        ..SolverConfig::default()
    }
}

#[test]
fn test_h2_minimal_basis_ground_state() {
    let ints = h2_minimal();
    let expected = h2_ground_state();

    for spin in [
        SpinVariant::Auto,
        SpinVariant::Ms0,
        SpinVariant::Spin0,
        SpinVariant::Spin1,
        SpinVariant::Uhf,
    ] {
        // full p-space: exact diagonalisation
        let exact = FciSolver::new(config(spin, 400))
            .kernel(&ints, 2, (1, 1), None)
            .unwrap();
        assert!(exact.converged);
        assert!((exact.energy() - expected).abs() < 1e-10, "{spin}: {}", exact.energy());

        // single-determinant p-space: Davidson
        let iterative = FciSolver::new(config(spin, 1))
            .kernel(&ints, 2, (1, 1), None)
            .unwrap();
        assert!(iterative.converged);
        assert!((iterative.energy() - expected).abs() < 1e-9, "{spin}: {}", iterative.energy());
    }
}

#[test]
fn test_h2_ground_state_vector() {
    let ints = h2_minimal();
    let result = FciSolver::new(config(SpinVariant::Ms0, 1))
        .kernel(&ints, 2, (1, 1), None)
        .unwrap();
    let c = result.civec();
    assert!((c.norm() - 1.0).abs() < 1e-10);
    // open-shell determinants do not mix into the closed-shell ground state
    assert!(c[(0, 1)].abs() < 1e-6 && c[(1, 0)].abs() < 1e-6);
    assert!(c[(0, 0)].abs() > 0.9);

    let space = FciSpace::new(2, (1, 1)).unwrap();
    let e = energy(&ints, c, &space).unwrap();
    assert!((e - result.energy()).abs() < 1e-9);
}

#[test]
fn test_davidson_matches_dense_spectrum() {
    let ints = random_restricted(4, 101);
    let space = FciSpace::new(4, (2, 2)).unwrap();
    let exact = sorted_eigenvalues(&brute_force_hamiltonian(&ints, &space));

    let solver = FciSolver::new(SolverConfig {
        nroots: 3,
        ..config(SpinVariant::Ms0, 4)
    });
    let result = solver.kernel_with_space(&ints, &space, None).unwrap();
    assert!(result.converged);
    assert_eq!(result.energies.len(), 3);
    for k in 0..3 {
        assert!((result.energies[k] - exact[k]).abs() < 1e-8);
    }
    for pair in result.history.windows(2) {
        assert!(pair[1].energy <= pair[0].energy + 1e-10);
    }
}

#[test]
fn test_spin1_high_spin_matches_dense_spectrum() {
    let ints = random_restricted(5, 111);
    let space = FciSpace::new(5, (3, 1)).unwrap();
    let exact = sorted_eigenvalues(&brute_force_hamiltonian(&ints, &space));

    let result = FciSolver::new(config(SpinVariant::Auto, 6))
        .kernel_with_space(&ints, &space, None)
        .unwrap();
    assert_eq!(result.variant, SpinVariant::Spin1);
    assert!(result.converged);
    assert!((result.energy() - exact[0]).abs() < 1e-8);
}

#[test]
fn test_unrestricted_kernel_equals_restricted_for_equal_blocks() {
    let ints = random_restricted(4, 121);
    let restricted = FciSolver::new(config(SpinVariant::Spin1, 3))
        .kernel(&ints, 4, (2, 1), None)
        .unwrap();
    let unrestricted = FciSolver::new(config(SpinVariant::Auto, 3))
        .kernel(&ints.to_unrestricted(), 4, (2, 1), None)
        .unwrap();
    assert_eq!(unrestricted.variant, SpinVariant::Uhf);
    assert!((restricted.energy() - unrestricted.energy()).abs() < 1e-8);
}

#[test]
fn test_unrestricted_matches_dense_spectrum() {
    let ints = random_unrestricted(4, 131);
    let space = FciSpace::new(4, (2, 2)).unwrap();
    let exact = sorted_eigenvalues(&brute_force_hamiltonian(&ints, &space));
    let result = FciSolver::new(config(SpinVariant::Uhf, 5))
        .kernel_with_space(&ints, &space, None)
        .unwrap();
    assert!(result.converged);
    assert!((result.energy() - exact[0]).abs() < 1e-8);
}

#[test]
fn test_spin0_keeps_symmetric_civec() {
    let ints = random_restricted(4, 141);
    let space = FciSpace::new(4, (2, 2)).unwrap();
    let result = FciSolver::new(config(SpinVariant::Spin0, 5))
        .kernel_with_space(&ints, &space, None)
        .unwrap();
    assert!(result.converged);
    let c = result.civec();
    assert!((c - c.transpose()).amax() < 1e-8);

    let exact = sorted_eigenvalues(&brute_force_hamiltonian(&ints, &space));
    assert!(result.energy() >= exact[0] - 1e-8);
    assert!(exact.iter().any(|&e| (e - result.energy()).abs() < 1e-8));

    let ms0 = FciSolver::new(config(SpinVariant::Ms0, 5))
        .kernel_with_space(&ints, &space, None)
        .unwrap();
    assert!(ms0.energy() <= result.energy() + 1e-8);
}

#[test]
fn test_ci0_restart_converges_quickly() {
    let ints = random_restricted(4, 151);
    let solver = FciSolver::new(config(SpinVariant::Ms0, 4));
    let first = solver.kernel(&ints, 4, (2, 2), None).unwrap();
    let second = solver
        .kernel(&ints, 4, (2, 2), Some(&first.civecs[..]))
        .unwrap();
    assert!(second.converged);
    assert!(second.iterations <= 3);
    assert!((second.energy() - first.energy()).abs() < 1e-10);
}

#[test]
fn test_ci0_bypasses_full_space_diagonalisation() {
    let ints = h2_minimal();
    let solver = FciSolver::new(config(SpinVariant::Ms0, 400));
    let first = solver.kernel(&ints, 2, (1, 1), None).unwrap();
    assert_eq!(first.iterations, 0);

    let restarted = solver
        .kernel(&ints, 2, (1, 1), Some(&first.civecs[..]))
        .unwrap();
    assert!(restarted.iterations >= 1);
    assert!(restarted.converged);
    assert!((restarted.energy() - first.energy()).abs() < 1e-10);
}

#[test]
fn test_multiple_roots_include_exchange_antisymmetric_states() {
    let ints = random_restricted(7, 11);
    let space = FciSpace::new(7, (3, 3)).unwrap();
    let exact = sorted_eigenvalues(&brute_force_hamiltonian(&ints, &space));
    let reference = [-8.3379428438, -7.7288738184, -7.5484766988];
    for (e, r) in exact.iter().zip(reference) {
        assert!((e - r).abs() < 1e-8, "{e} vs {r}");
    }

    for spin in [SpinVariant::Ms0, SpinVariant::Spin1] {
        let solver = FciSolver::new(SolverConfig {
            nroots: 3,
            spin,
            ..SolverConfig::default()
        });
        let result = solver.kernel_with_space(&ints, &space, None).unwrap();
        assert!(result.converged, "{spin}");
        for k in 0..3 {
            assert!(
                (result.energies[k] - exact[k]).abs() < 1e-7,
                "{spin} root {k}: {} vs {}",
                result.energies[k],
                exact[k]
            );
        }
    }
}

#[test]
fn test_pspace_guesses_respect_projection() {
    let ints = random_restricted(4, 191);
    let space = FciSpace::new(4, (2, 2)).unwrap();
    let kernel = DirectSpin0;
    let hdiag = kernel.make_hdiag(&ints, &space).unwrap();
    let pspace = kernel.pspace(&ints, &hdiag, &space, 36).unwrap();
    let (_, pv) = pspace.eigh();

    let guesses = pspace_guesses(&kernel, &pv, &pspace.addresses, &space, 36);
    // antisymmetric eigenvectors vanish under the exchange projection
    assert!(!guesses.is_empty() && guesses.len() < 36);
    for g in &guesses {
        let c = space.unflatten(g);
        assert!((g.norm() - 1.0).abs() < 1e-10);
        assert!((&c - c.transpose()).amax() < 1e-10);
    }
}

#[test]
fn test_non_convergence_returns_best_vectors() {
    let ints = random_restricted(5, 161);
    let solver = FciSolver::new(SolverConfig {
        max_cycle: 1,
        ..config(SpinVariant::Ms0, 2)
    });
    let result = solver.kernel(&ints, 5, (2, 2), None).unwrap();
    assert!(!result.converged);
    assert_eq!(result.iterations, 1);
    assert_eq!(result.civecs.len(), 1);
}

#[test]
fn test_incompatible_variants_are_rejected() {
    let restricted = random_restricted(4, 171);
    let unrestricted = random_unrestricted(4, 172);

    let ms0 = FciSolver::new(config(SpinVariant::Ms0, 10));
    assert!(matches!(
        ms0.kernel(&restricted, 4, (2, 1), None),
        Err(FciError::IncompatibleIntegrals(_))
    ));
    let spin1 = FciSolver::new(config(SpinVariant::Spin1, 10));
    assert!(matches!(
        spin1.kernel(&unrestricted, 4, (2, 1), None),
        Err(FciError::IncompatibleIntegrals(_))
    ));
    assert!(matches!(
        spin1.kernel(&restricted, 5, (2, 1), None),
        Err(FciError::ShapeMismatch { .. })
    ));

    let bad = FciSolver::new(SolverConfig {
        nroots: 0,
        ..SolverConfig::default()
    });
    assert!(matches!(
        bad.kernel(&restricted, 4, (2, 2), None),
        Err(FciError::InvalidConfiguration(_))
    ));
}

#[test]
fn test_spin_variant_parsing_and_resolution() {
    assert_eq!("MS0".parse::<SpinVariant>().unwrap(), SpinVariant::Ms0);
    assert_eq!("uhf".parse::<SpinVariant>().unwrap(), SpinVariant::Uhf);
    assert!("triplet".parse::<SpinVariant>().is_err());
    assert_eq!(SpinVariant::Spin0.to_string(), "spin0");

    let restricted = random_restricted(3, 181);
    let unrestricted = random_unrestricted(3, 182);
    let auto = SpinVariant::Auto;
    assert_eq!(auto.resolve(&restricted, (1, 1).into()), SpinVariant::Ms0);
    assert_eq!(auto.resolve(&restricted, (2, 1).into()), SpinVariant::Spin1);
    assert_eq!(auto.resolve(&unrestricted, (1, 1).into()), SpinVariant::Uhf);
    assert_eq!(
        SpinVariant::Spin0.resolve(&restricted, (1, 1).into()),
        SpinVariant::Spin0
    );
}
