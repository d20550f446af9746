//! # 峰识别引擎
//!
//! 将非散射候选峰匹配到数据库中的发射谱线。
//!
//! ## 算法
//! 每个候选峰按数据库查询顺序（相对强度降序、残差升序）依次申请谱线槽位
//! (元素, 子线)。槽位被占用时，残差较小者保留（残差相同则能量较低者保留），
//! 落选者继续申请下一条谱线，直到申请完毕。结果与申请顺序无关。
//!
//! ## 约定
//! - 输出顺序与输入一致
//! - 散射峰直接输出为 `Scatter`，不参与匹配
//! - 歧义不是错误：所有候选谱线都被占用时为 `Unidentified(Ambiguous)`
//!
//! ## 依赖关系
//! - 被 `commands/` 调用
//! - 使用 `xrf/database.rs` 的 `LineDatabase::lookup`

use crate::error::{Result, XrfError};
use crate::models::{
    CandidatePeak, Identification, IdentifiedPeak, LineMatch, UnidentifiedReason,
};
use crate::xrf::database::LineDatabase;

use std::cmp::Ordering;
use std::collections::{HashMap, VecDeque};

/// 默认识别容差 (eV)
pub const DEFAULT_TOLERANCE_EV: f64 = 60.0;

/// 识别候选峰
pub fn identify(
    candidates: &[CandidatePeak],
    db: &LineDatabase,
    excitation_kev: f64,
    tolerance_kev: f64,
) -> Result<Vec<IdentifiedPeak>> {
    if !tolerance_kev.is_finite() || tolerance_kev <= 0.0 {
        return Err(XrfError::InvalidArgument(format!(
            "identification tolerance must be positive, got {} keV",
            tolerance_kev
        )));
    }

    db.lines(excitation_kev)?;

    // 每个候选峰的偏好列表；散射峰为 None
    let mut preferences: Vec<Option<Vec<LineMatch>>> = Vec::with_capacity(candidates.len());
    for peak in candidates {
        if peak.is_scatter() {
            preferences.push(None);
        } else {
            preferences.push(Some(db.lookup(excitation_kev, peak.energy_kev, tolerance_kev)?));
        }
    }

    let assignment = stable_assignment(candidates, &preferences);

    let results = candidates
        .iter()
        .zip(&preferences)
        .enumerate()
        .map(|(i, (peak, prefs))| {
            let (identification, count) = match (peak.scatter, prefs) {
                (Some(kind), _) => (Identification::Scatter(kind), 0),
                (None, Some(prefs)) => {
                    let identification = match assignment.get(&i) {
                        Some(&choice) => {
                            let m = &prefs[choice];
                            Identification::Line {
                                line: m.line.clone(),
                                residual_kev: m.residual_kev,
                                confidence: confidence(m, prefs, tolerance_kev),
                            }
                        }
                        None if prefs.is_empty() => {
                            Identification::Unidentified(UnidentifiedReason::NoLineInTolerance)
                        }
                        None => Identification::Unidentified(UnidentifiedReason::Ambiguous),
                    };
                    (identification, prefs.len())
                }
                (None, None) => (
                    Identification::Unidentified(UnidentifiedReason::NoLineInTolerance),
                    0,
                ),
            };
            IdentifiedPeak {
                peak: peak.clone(),
                identification,
                candidates_in_tolerance: count,
            }
        })
        .collect();

    Ok(results)
}

/// 置信度 = (1 - 残差/容差) × (该谱线相对强度 / 容差内相对强度之和)
pub fn confidence(chosen: &LineMatch, in_tolerance: &[LineMatch], tolerance_kev: f64) -> f64 {
    let total: f64 = in_tolerance.iter().map(|m| m.line.relative_intensity).sum();
    if total <= 0.0 {
        return 0.0;
    }
    let closeness = (1.0 - chosen.residual_kev / tolerance_kev).clamp(0.0, 1.0);
    closeness * chosen.line.relative_intensity / total
}

/// 稳定分配：返回 候选峰下标 → 偏好列表下标
fn stable_assignment(
    candidates: &[CandidatePeak],
    preferences: &[Option<Vec<LineMatch>>],
) -> HashMap<usize, usize> {
    // 按能量升序排队
    let mut order: Vec<usize> = (0..candidates.len())
        .filter(|&i| preferences[i].is_some())
        .collect();
    order.sort_by(|&a, &b| {
        candidates[a]
            .energy_kev
            .partial_cmp(&candidates[b].energy_kev)
            .unwrap_or(Ordering::Equal)
            .then(a.cmp(&b))
    });

    let mut free: VecDeque<usize> = order.into_iter().collect();
    let mut next_choice = vec![0usize; candidates.len()];
    // (元素, 子线) → (候选峰, 偏好下标)
    let mut slots: HashMap<(String, String), (usize, usize)> = HashMap::new();

    while let Some(i) = free.pop_front() {
        let prefs = match &preferences[i] {
            Some(p) => p,
            None => continue,
        };
        let choice = next_choice[i];
        if choice >= prefs.len() {
            continue;
        }
        next_choice[i] += 1;

        let m = &prefs[choice];
        let key = (m.line.element.clone(), m.line.sub_line.clone());

        match slots.get(&key).copied() {
            None => {
                slots.insert(key, (i, choice));
            }
            Some((holder, holder_choice)) => {
                let holder_match = match &preferences[holder] {
                    Some(p) => &p[holder_choice],
                    None => continue,
                };
                if challenger_wins(candidates, i, m, holder, holder_match) {
                    slots.insert(key, (i, choice));
                    free.push_back(holder);
                } else {
                    free.push_back(i);
                }
            }
        }
    }

    slots.into_values().collect()
}

/// 残差较小者胜；相同时能量较低者胜
fn challenger_wins(
    candidates: &[CandidatePeak],
    challenger: usize,
    challenger_match: &LineMatch,
    holder: usize,
    holder_match: &LineMatch,
) -> bool {
    match challenger_match
        .residual_kev
        .partial_cmp(&holder_match.residual_kev)
        .unwrap_or(Ordering::Equal)
    {
        Ordering::Less => true,
        Ordering::Greater => false,
        Ordering::Equal => candidates[challenger]
            .energy_kev
            .partial_cmp(&candidates[holder].energy_kev)
            .unwrap_or(Ordering::Equal)
            .then(challenger.cmp(&holder))
            .is_lt(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LineFamily, ScatterKind, SpectrumStack};
    use crate::xrf::calibration::calibrate;
    use crate::xrf::correction::correct;
    use crate::xrf::database::LineSource;
    use crate::xrf::detection::{detect, DetectionConfig};
    use crate::xrf::synthetic::{spectrum_with_peaks, FakeLineSource};
    use crate::xrf::{BackgroundMethod, ScatterConfig, SmoothingMethod};

    fn peak(energy_kev: f64) -> CandidatePeak {
        CandidatePeak {
            channel: (energy_kev * 100.0).round() as usize,
            energy_kev,
            height: 100.0,
            prominence: 100.0,
            left_base: 0,
            right_base: 0,
            width: 10.0,
            scatter: None,
        }
    }

    fn fake_db(source: FakeLineSource) -> LineDatabase {
        let elements = source.elements();
        let mut db = LineDatabase::new(Box::new(source)).with_elements(elements);
        db.initialize(10.0).unwrap();
        db
    }

    #[test]
    fn test_equidistant_lines_prefer_intensity() {
        let db = fake_db(
            FakeLineSource::new()
                .with_line("Aa", "Ka1", 5.0, 1.0, 6.0)
                .with_line("Aa", "Kb1", 5.6, 0.2, 6.0)
                .with_line("Bb", "La1", 5.2, 0.3, 7.0)
                .with_line("Bb", "Lb1", 5.9, 1.0, 7.0),
        );

        let result = identify(&[peak(5.1)], &db, 10.0, 0.15).unwrap();
        let line = result[0].line().unwrap();
        assert_eq!(line.element, "Aa");
        assert_eq!(line.family, LineFamily::Ka);
        assert_eq!(result[0].candidates_in_tolerance, 2);

        if let Identification::Line { confidence, .. } = &result[0].identification {
            let rel_a = 1.0 / 1.2;
            let rel_b = 0.3 / 1.3;
            let expected = (1.0 - 0.1 / 0.15) * rel_a / (rel_a + rel_b);
            assert!((confidence - expected).abs() < 1e-6);
        }
    }

    #[test]
    fn test_conflict_resolution() {
        let source = || {
            FakeLineSource::new()
                .with_line("Aa", "Ka1", 5.00, 1.0, 6.0)
                .with_line("Bb", "La1", 5.08, 1.0, 6.0)
        };
        let db = fake_db(source());

        // 输入顺序与能量顺序相反
        let peaks = [peak(5.03), peak(4.98)];
        let result = identify(&peaks, &db, 10.0, 0.06).unwrap();
        assert_eq!(result[1].line().unwrap().element, "Aa");
        assert_eq!(result[0].line().unwrap().element, "Bb");

        let only_a = fake_db(FakeLineSource::new().with_line("Aa", "Ka1", 5.00, 1.0, 6.0));
        let result = identify(&peaks, &only_a, 10.0, 0.06).unwrap();
        assert_eq!(result[1].line().unwrap().element, "Aa");
        assert_eq!(
            result[0].identification,
            Identification::Unidentified(UnidentifiedReason::Ambiguous)
        );
    }

    #[test]
    fn test_equal_residual_goes_to_lower_energy() {
        let db = fake_db(FakeLineSource::new().with_line("Aa", "Ka1", 5.0, 1.0, 6.0));
        let result = identify(&[peak(5.03125), peak(4.96875)], &db, 10.0, 0.06).unwrap();
        assert!(result[1].is_identified());
        assert!(!result[0].is_identified());
    }

    #[test]
    fn test_scatter_and_unmatched_pass_through() {
        let db = fake_db(FakeLineSource::new().with_line("Aa", "Ka1", 5.0, 1.0, 6.0));
        let mut scatter = peak(5.0);
        scatter.scatter = Some(ScatterKind::Elastic);

        let result = identify(&[scatter, peak(7.5)], &db, 10.0, 0.06).unwrap();
        assert_eq!(result[0].identification, Identification::Scatter(ScatterKind::Elastic));
        assert_eq!(
            result[1].identification,
            Identification::Unidentified(UnidentifiedReason::NoLineInTolerance)
        );

        assert!(matches!(
            identify(&[peak(5.0)], &db, 12.0, 0.06),
            Err(XrfError::DatabaseNotInitialized { .. })
        ));
    }

    #[test]
    fn test_end_to_end_fe_cu_elastic() {
        let n = 1200;
        let data = spectrum_with_peaks(
            n,
            10.0,
            20.0,
            6.0,
            &[(6.40, 500.0), (8.05, 300.0), (10.0, 400.0)],
        );
        // 校正为恒等变换：deadtime = 1, i0 = 1
        let raw = SpectrumStack::from_rows(vec![data.clone()]).unwrap();
        let corrected = correct(&raw, &[1.0], &[1.0]).unwrap();
        let spectrum = corrected.max_envelope();
        assert_eq!(spectrum, data);

        let axis = calibrate(n, 10.0, 0.0).unwrap();
        let config = DetectionConfig::builder()
            .min_height(10.0)
            .min_prominence(10.0)
            .min_distance_ev(50.0)
            .smoothing(5, SmoothingMethod::MovingAverage)
            .background(BackgroundMethod::RollingMinimum { radius: 50 })
            .scatter(ScatterConfig {
                incident_energy_kev: Some(10.0),
                ..ScatterConfig::default()
            })
            .build()
            .unwrap();

        let detection = detect(&spectrum, &axis, &config).unwrap();
        assert_eq!(detection.candidates.len(), 3);

        let mut db = LineDatabase::builtin();
        db.initialize(10.0).unwrap();
        let result = identify(&detection.candidates, &db, 10.0, 0.060).unwrap();

        let names: Vec<String> = result
            .iter()
            .filter_map(|p| p.line().map(|l| l.name()))
            .collect();
        assert_eq!(names, vec!["Fe Ka", "Cu Ka"]);
        assert!(result[2].is_scatter());
        assert!(!result[2].is_identified());
    }
}
