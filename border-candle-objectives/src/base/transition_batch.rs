use anyhow::Result;
use border_objectives_core::ObjectiveError;
use candle_core::Tensor;

/// A batch of n-step transitions.
///
/// All fields share the leading (batch) dimension. [`TransitionBatch::new`] is
/// the only constructor, so a batch in hand has passed its shape checks.
#[derive(Clone, Debug)]
pub struct TransitionBatch {
    /// States `S_t`.
    pub(crate) s: Tensor,

    /// Actions `A_t`.
    pub(crate) a: Tensor,

    /// `log π_b(A_t|S_t)` recorded from the behavior policy when the action was taken.
    pub(crate) logp: Option<Tensor>,

    /// Discounted n-step reward sum `R_t + γ R_{t+1} + … + γ^{n-1} R_{t+n-1}`.
    pub(crate) rn: Tensor,

    /// Bootstrap factor: `0` if the n-step window crosses a terminal state, `γ^n` otherwise.
    pub(crate) i_n: Tensor,

    /// States `S_{t+n}`.
    pub(crate) s_next: Tensor,
}

fn batch_dim(name: &str, t: &Tensor) -> Result<usize> {
    match t.dims().first() {
        Some(n) => Ok(*n),
        None => Err(ObjectiveError::BatchShape(format!("{} has no batch dimension", name)).into()),
    }
}

fn check_rank1(name: &str, t: &Tensor) -> Result<()> {
    match t.rank() {
        1 => Ok(()),
        _ => Err(ObjectiveError::BatchShape(format!(
            "{} must have shape [batch], got {:?}",
            name,
            t.dims()
        ))
        .into()),
    }
}

impl TransitionBatch {
    /// Builds a batch, checking that all fields agree on the batch size.
    pub fn new(
        s: Tensor,
        a: Tensor,
        logp: Option<Tensor>,
        rn: Tensor,
        i_n: Tensor,
        s_next: Tensor,
    ) -> Result<Self> {
        let batch_size = batch_dim("S", &s)?;
        check_rank1("Rn", &rn)?;
        check_rank1("In", &i_n)?;
        if let Some(logp) = &logp {
            check_rank1("logP", logp)?;
        }

        let mut fields = vec![("A", &a), ("Rn", &rn), ("In", &i_n), ("S_next", &s_next)];
        if let Some(logp) = &logp {
            fields.push(("logP", logp));
        }
        for (name, t) in fields {
            let n = batch_dim(name, t)?;
            if n != batch_size {
                return Err(ObjectiveError::BatchShape(format!(
                    "{} has batch size {}, S has {}",
                    name, n, batch_size
                ))
                .into());
            }
        }

        Ok(Self {
            s,
            a,
            logp,
            rn,
            i_n,
            s_next,
        })
    }

    /// Number of transitions.
    pub fn batch_size(&self) -> usize {
        self.s.dims()[0]
    }

    /// States `S_t`.
    pub fn s(&self) -> &Tensor {
        &self.s
    }

    /// Actions `A_t`.
    pub fn a(&self) -> &Tensor {
        &self.a
    }

    /// Discounted n-step reward sums.
    pub fn rn(&self) -> &Tensor {
        &self.rn
    }

    /// Bootstrap factors.
    pub fn i_n(&self) -> &Tensor {
        &self.i_n
    }

    /// States `S_{t+n}`.
    pub fn s_next(&self) -> &Tensor {
        &self.s_next
    }

    /// Behavior-policy log-propensities.
    pub fn logp(&self) -> Result<&Tensor> {
        self.logp
            .as_ref()
            .ok_or_else(|| ObjectiveError::MissingPropensity("TransitionBatch".to_string()).into())
    }
}
