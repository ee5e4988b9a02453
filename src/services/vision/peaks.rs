//! 1-D peak finding shared by the panel and row locators.

/// Indices of strict local maxima above `height`, thinned so that no two
/// kept peaks are closer than `spacing`.
///
/// Thinning visits peaks from highest to lowest (lower index first on
/// equal height) and drops every weaker peak inside the spacing window of
/// a kept one. The result is in ascending index order.
pub fn find_peaks(values: &[f64], height: f64, spacing: Option<f64>) -> Vec<usize> {
    if values.len() < 3 {
        return Vec::new();
    }

    let candidates: Vec<usize> = (1..values.len() - 1)
        .filter(|&i| values[i] > values[i - 1] && values[i] > values[i + 1] && values[i] > height)
        .collect();

    let spacing = match spacing {
        Some(spacing) if spacing > 1.0 => spacing,
        _ => return candidates,
    };

    let mut by_strength: Vec<usize> = (0..candidates.len()).collect();
    by_strength.sort_by(|&a, &b| {
        values[candidates[b]]
            .total_cmp(&values[candidates[a]])
            .then(a.cmp(&b))
    });

    let mut keep = vec![true; candidates.len()];
    for &slot in &by_strength {
        if !keep[slot] {
            continue;
        }
        let peak = candidates[slot];

        for other in (0..slot).rev() {
            if ((peak - candidates[other]) as f64) >= spacing {
                break;
            }
            keep[other] = false;
        }
        for other in slot + 1..candidates.len() {
            if ((candidates[other] - peak) as f64) >= spacing {
                break;
            }
            keep[other] = false;
        }
    }

    candidates
        .into_iter()
        .zip(keep)
        .filter_map(|(index, kept)| kept.then_some(index))
        .collect()
}

/// Peak indices ordered strongest first (lower index wins ties)
pub fn strongest_first(values: &[f64], peaks: &[usize]) -> Vec<usize> {
    let mut ordered = peaks.to_vec();
    ordered.sort_by(|&a, &b| values[b].total_cmp(&values[a]).then(a.cmp(&b)));
    ordered
}
