//! Базовая описательная статистика

/// Квантиль с линейной интерполяцией между соседними рангами.
/// `sorted` должен быть отсортирован по возрастанию и не пуст.
pub fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    let pos = (sorted.len() - 1) as f64 * q.clamp(0.0, 1.0);
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

pub fn sorted_finite(values: impl IntoIterator<Item = f64>) -> Vec<f64> {
    let mut sorted: Vec<f64> = values.into_iter().filter(|v| v.is_finite()).collect();
    sorted.sort_by(f64::total_cmp);
    sorted
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Корреляция Пирсона по парам, где оба значения присутствуют.
/// None, если пар меньше двух или одна из колонок константна.
pub fn pearson(pairs: &[(f64, f64)]) -> Option<f64> {
    let &(x0, y0) = pairs.first()?;
    let constant_x = pairs.iter().all(|&(x, _)| x == x0);
    let constant_y = pairs.iter().all(|&(_, y)| y == y0);
    if pairs.len() < 2 || constant_x || constant_y {
        return None;
    }
    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|(_, y)| y).sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (x, y) in pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    let denom = (var_x * var_y).sqrt();
    if denom == 0.0 {
        return None;
    }
    Some((cov / denom).clamp(-1.0, 1.0))
}
