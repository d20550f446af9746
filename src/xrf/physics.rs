//! # 散射物理
//!
//! 弹性与 Compton 散射峰能量预测，以及谱线的激发效率。
//!
//! ## 激发效率
//! 效率 = 荧光产额 ω × 光电截面相对吸收边处的衰减 (E_edge / E0)^(8/3)，
//! 取值 0-1。入射能量刚越过吸收边时效率最高，远离吸收边时迅速下降。
//! 荧光产额使用 ω = Z⁴ / (A + Z⁴) 的经验形式。
//!
//! ## 依赖关系
//! - 被 `xrf/scatter.rs`, `xrf/mapping.rs` 使用
//! - 被 `xrf/database.rs` 在初始化时调用

/// 电子静止能量 (keV)
pub const ELECTRON_REST_ENERGY_KEV: f64 = 511.0;

/// 默认探测器散射角（度）
pub const DEFAULT_DETECTOR_ANGLE_DEG: f64 = 90.0;

use crate::models::Shell;

/// 光电截面随能量衰减的幂次
const PHOTO_CROSS_SECTION_EXPONENT: f64 = 8.0 / 3.0;

/// 荧光产额经验常数 A
fn yield_constant(shell: Shell) -> f64 {
    match shell {
        Shell::K => 9.0e5,
        Shell::L => 9.0e7,
        Shell::M => 1.7e9,
    }
}

/// 壳层荧光产额 ω = Z⁴ / (A + Z⁴)
pub fn fluorescence_yield(z: u32, shell: Shell) -> f64 {
    let z4 = (z as f64).powi(4);
    z4 / (yield_constant(shell) + z4)
}

/// 激发效率（0-1），入射能量不高于吸收边时为 0
pub fn excitation_efficiency(edge_kev: f64, incident_kev: f64, omega: f64) -> f64 {
    if edge_kev <= 0.0 || incident_kev <= edge_kev {
        return 0.0;
    }
    let falloff = (edge_kev / incident_kev).powf(PHOTO_CROSS_SECTION_EXPONENT);
    (omega * falloff).clamp(0.0, 1.0)
}

/// 弹性 (Rayleigh) 散射能量，与角度无关
pub fn elastic_energy(incident_kev: f64) -> f64 {
    incident_kev
}

/// Compton 散射能量
///
/// E' = E0 / (1 + (E0 / m_e c²)(1 - cos θ))
pub fn compton_energy(incident_kev: f64, angle_deg: f64) -> f64 {
    let cos_theta = angle_deg.to_radians().cos();
    incident_kev / (1.0 + (incident_kev / ELECTRON_REST_ENERGY_KEV) * (1.0 - cos_theta))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compton_shift() {
        // 前向散射无能量损失
        assert!((compton_energy(10.0, 0.0) - 10.0).abs() < 1e-12);

        let e90 = compton_energy(10.0, 90.0);
        assert!((e90 - 10.0 / (1.0 + 10.0 / 511.0)).abs() < 1e-9);
        assert!(compton_energy(10.0, 135.0) < e90);
        assert_eq!(elastic_energy(12.5), 12.5);
    }

    #[test]
    fn test_fluorescence_yield() {
        // Fe K ≈ 0.35, Cu K ≈ 0.44, Pb L3 ≈ 0.32
        assert!((fluorescence_yield(26, Shell::K) - 0.34).abs() < 0.03);
        assert!((fluorescence_yield(29, Shell::K) - 0.44).abs() < 0.03);
        assert!((fluorescence_yield(82, Shell::L) - 0.33).abs() < 0.03);
        assert!(fluorescence_yield(11, Shell::K) < fluorescence_yield(30, Shell::K));
    }

    #[test]
    fn test_excitation_efficiency_near_edge() {
        assert_eq!(excitation_efficiency(7.112, 7.0, 0.35), 0.0);
        assert_eq!(excitation_efficiency(7.112, 7.112, 0.35), 0.0);

        let near = excitation_efficiency(9.5, 10.0, 1.0);
        let far = excitation_efficiency(3.0, 10.0, 1.0);
        assert!(near > 0.8);
        assert!(far < 0.05);
        assert!(excitation_efficiency(7.112, 7.2, 5.0) <= 1.0);
    }
}
