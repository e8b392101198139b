use crate::cistring_impl::FciSpace;
use crate::davidson_impl::eigh_sorted;
use crate::integrals::Integrals;
use crate::io::write_matrix;
use crate::rdm_impl::{make_rdm12, make_rdm1s, reorder_rdm};
use crate::solver_impl::FciResult;
use color_eyre::eyre::{Result, WrapErr};
use tracing::{info, warn};

pub fn report_summary(result: &FciResult, ecore: f64) {
    info!("\nFCI calculation finished ({} variant).", result.variant);
    if !result.converged {
        warn!("Energies below are not converged");
    }
    info!("Davidson cycles: {}", result.iterations);
    info!("Core energy: {:.10} au", ecore);

    info!("\nFinal energies:");
    for (k, e) in result.energies.iter().enumerate() {
        info!(
            "  Root {}: E(elec) = {:.10}  E(total) = {:.10} au",
            k,
            e,
            e + ecore
        );
    }
}

/// Density matrices of the lowest root, natural occupations and the
/// energy they reproduce.
pub fn report_density_matrices(
    result: &FciResult,
    ints: &Integrals,
    space: &FciSpace,
    ecore: f64,
) -> Result<()> {
    let civec = result.civec();
    let (dm1a, dm1b) = make_rdm1s(civec, space).wrap_err("Failed to build 1-RDMs")?;
    let dm1 = &dm1a + &dm1b;

    let mut buffer = Vec::new();
    write_matrix(&mut buffer, "Spin-summed 1-RDM", &dm1)?;
    info!("\n{}", String::from_utf8_lossy(&buffer));

    let (occupations, _) = eigh_sorted(dm1.clone());
    let listed: Vec<String> = occupations.iter().rev().map(|n| format!("{n:.6}")).collect();
    info!("Natural occupations: [{}]", listed.join(", "));
    info!(
        "Electrons: {:.6} alpha, {:.6} beta",
        dm1a.trace(),
        dm1b.trace()
    );

    // spin-free identity only holds for restricted integrals
    if ints.is_restricted() {
        let (dm1, dm2) = make_rdm12(civec, space).wrap_err("Failed to build 2-RDM")?;
        let (dm1, dm2) = reorder_rdm(&dm1, &dm2)?;
        let e_rdm = ints.h1e_alpha().component_mul(&dm1).sum() + 0.5 * dm2.contract_eri(ints.eri_aa());
        info!(
            "Energy from density matrices: {:.10} au (deviation {:.2e})",
            e_rdm + ecore,
            e_rdm - result.energy()
        );
    }
    Ok(())
}
