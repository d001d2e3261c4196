//! Nearest-trace assignment for detectors with several simultaneous traces.

/// Running nearest-trace search over all photons of an exposure.
///
/// Traces are offered one at a time, in table order, together with the signed
/// distance `y - trace(x)` of every photon. A photon keeps the trace with the
/// smallest absolute distance; on a tie the earlier trace wins. Undefined
/// distances never win.
#[derive(Debug, Clone)]
pub(crate) struct NearestTrace {
    /// Index of the assigned trace per photon.
    pub line: Vec<usize>,
    /// Signed distance to the assigned trace; `NaN` when no trace is defined.
    pub xdisp: Vec<f64>,
}

impl NearestTrace {
    pub fn new(n_photons: usize) -> Self {
        Self {
            line: vec![0; n_photons],
            xdisp: vec![f64::NAN; n_photons],
        }
    }

    pub fn offer(&mut self, trace: usize, distances: impl IntoIterator<Item = f64>) {
        for ((line, best), d) in self
            .line
            .iter_mut()
            .zip(self.xdisp.iter_mut())
            .zip(distances)
        {
            if d.is_nan() {
                continue;
            }
            if best.is_nan() || d.abs() < best.abs() {
                *best = d;
                *line = trace;
            }
        }
    }

    /// Photons with no defined distance to any trace.
    pub fn unassigned(&self) -> usize {
        self.xdisp.iter().filter(|d| d.is_nan()).count()
    }

    /// Photon indices grouped by assigned trace.
    pub fn groups(&self, n_traces: usize) -> Vec<Vec<usize>> {
        let mut groups = vec![Vec::new(); n_traces];
        for (i, &l) in self.line.iter().enumerate() {
            groups[l].push(i);
        }
        groups
    }
}
