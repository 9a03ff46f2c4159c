use nalgebra::Vector3;

/// Open-boundary Coulomb energy: electron-electron repulsion, electron-nucleus
/// attraction and nucleus-nucleus repulsion.
pub fn potential_energy(r: &[Vector3<f64>], atoms: &[Vector3<f64>], charges: &[f64]) -> f64 {
    let mut v = 0.0;
    for i in 0..r.len() {
        for j in (i + 1)..r.len() {
            v += 1.0 / (r[i] - r[j]).norm();
        }
        for (atom, z) in atoms.iter().zip(charges.iter()) {
            v -= z / (r[i] - atom).norm();
        }
    }
    for i in 0..atoms.len() {
        for j in (i + 1)..atoms.len() {
            v += charges[i] * charges[j] / (atoms[i] - atoms[j]).norm();
        }
    }
    v
}
