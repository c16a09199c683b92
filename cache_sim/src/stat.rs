use std::fmt;

pub trait Stat {
    fn view(&self, max_width: usize) -> Box<dyn StatView + '_>;
}

pub trait StatView: fmt::Display {
    /// header of stat
    fn header(&self) -> &'static str;
    /// body width
    fn width(&self) -> usize;
}

pub trait AddStats {
    /// add stat to `buf`.
    fn add_stats(&self, buf: &mut Stats);
}

#[derive(Default)]
pub struct Stats {
    stats: Vec<Box<dyn Stat>>,
}

impl IntoIterator for Stats {
    type Item = Box<dyn Stat>;

    type IntoIter = <Vec<Box<dyn Stat>> as IntoIterator>::IntoIter;

    fn into_iter(self) -> Self::IntoIter {
        self.stats.into_iter()
    }
}

impl Extend<Box<dyn Stat>> for Stats {
    fn extend<T: IntoIterator<Item = Box<dyn Stat>>>(&mut self, iter: T) {
        self.stats.extend(iter)
    }
}

impl Stats {
    pub fn push(&mut self, stat: Box<dyn Stat>) {
        self.stats.push(stat)
    }
    pub fn len(&self) -> usize {
        self.stats.len()
    }
    pub fn is_empty(&self) -> bool {
        self.stats.is_empty()
    }
}

pub struct StatAllView<'s> {
    views: Vec<Box<dyn StatView + 's>>,
}

impl Stats {
    pub fn view(&self, max_width: usize) -> StatAllView<'_> {
        StatAllView {
            views: self.stats.iter().map(|s| s.view(max_width)).collect(),
        }
    }
}

impl fmt::Display for StatAllView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .views
            .iter()
            .map(|s| s.header().len().max(s.width()))
            .max()
            .unwrap_or(0);
        writeln!(f, "{:-^width$}", " statistics ")?;
        for sv in &self.views {
            writeln!(f, "{}:", sv.header())?;
            writeln!(f, "{}", sv)?;
        }
        write!(f, "{:-<width$}", "")
    }
}

/// percentage of `part` in `total`, formatted for the stat views.
pub fn percent(part: usize, total: usize) -> String {
    if total == 0 {
        return format!("{:.6}", 0.);
    }
    format!("{:.6}", 100. * part as f64 / total as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed;

    struct FixedView;

    impl Stat for Fixed {
        fn view(&self, _: usize) -> Box<dyn StatView + '_> {
            Box::new(FixedView)
        }
    }

    impl StatView for FixedView {
        fn header(&self) -> &'static str {
            "fixed"
        }
        fn width(&self) -> usize {
            20
        }
    }

    impl fmt::Display for FixedView {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            writeln!(f, "  body")
        }
    }

    #[test]
    fn test_view_frame() {
        let mut ss = Stats::default();
        ss.push(Box::new(Fixed));
        let out = ss.view(80).to_string();
        let mut lines = out.lines();
        assert_eq!(Some("---- statistics ----"), lines.next());
        assert_eq!(Some("fixed:"), lines.next());
        assert_eq!(Some("  body"), lines.next());
        assert_eq!(Some("-".repeat(20).as_str()), out.lines().last());
    }
    #[test]
    fn test_percent() {
        assert_eq!("50.000000", percent(1, 2));
        assert_eq!("0.000000", percent(0, 0));
    }
}
