use anyhow::{anyhow, Context, Result};
use candle_core::{Tensor, Var};
use candle_nn::VarMap;
use std::collections::{btree_map::Iter, BTreeMap};

/// Named tensors holding parameters, gradients or internal state of a
/// function approximator.
///
/// The collection is treated as a value: updates such as [`NamedTensors::sgd_step`]
/// return a new collection and leave `self` untouched. Cloning is cheap because
/// [`Tensor`] is reference counted.
#[derive(Clone, Debug, Default)]
pub struct NamedTensors {
    named_tensors: BTreeMap<String, Tensor>,
}

impl NamedTensors {
    /// An empty collection, e.g. the state of a stateless approximator.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a collection from name-tensor pairs.
    pub fn from_pairs<K: Into<String>>(pairs: impl IntoIterator<Item = (K, Tensor)>) -> Self {
        Self {
            named_tensors: pairs.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// Returns the tensor of the given name.
    pub fn get(&self, name: &str) -> Result<&Tensor> {
        self.named_tensors
            .get(name)
            .with_context(|| format!("No tensor named {}", name))
    }

    /// Inserts or replaces a tensor.
    pub fn insert(&mut self, name: impl Into<String>, t: Tensor) {
        self.named_tensors.insert(name.into(), t);
    }

    /// Iterates over the tensors in name order.
    pub fn iter(&self) -> Iter<'_, String, Tensor> {
        self.named_tensors.iter()
    }

    /// Number of tensors.
    pub fn len(&self) -> usize {
        self.named_tensors.len()
    }

    /// Returns `true` if there is no tensor.
    pub fn is_empty(&self) -> bool {
        self.named_tensors.is_empty()
    }

    /// Applies `f` to every tensor.
    pub fn map<F>(&self, mut f: F) -> Result<Self>
    where
        F: FnMut(&str, &Tensor) -> Result<Tensor>,
    {
        let named_tensors = self
            .named_tensors
            .iter()
            .map(|(k, v)| Ok((k.clone(), f(k, v)?)))
            .collect::<Result<_>>()?;
        Ok(Self { named_tensors })
    }

    /// Zero tensors with the same names and shapes.
    pub fn zeros_like(&self) -> Result<Self> {
        self.map(|_, t| Ok(t.zeros_like()?))
    }

    /// Returns `self - lr * grads`.
    ///
    /// `grads` must contain a tensor for every name in `self`.
    pub fn sgd_step(&self, grads: &NamedTensors, lr: f64) -> Result<Self> {
        self.map(|k, p| Ok(p.sub(&grads.get(k)?.affine(lr, 0.0)?)?))
    }

    /// Lifts every tensor into a fresh [`Var`], detached from `self`.
    pub(crate) fn to_vars(&self) -> Result<BTreeMap<String, Var>> {
        self.named_tensors
            .iter()
            .map(|(k, v)| Ok((k.clone(), Var::from_tensor(&v.detach())?)))
            .collect()
    }

    /// Copies the current values of variables in a [`VarMap`].
    ///
    /// The copies do not share storage with the variables, so later optimizer
    /// steps on the [`VarMap`] leave them unchanged.
    pub fn copy_from(vm: &VarMap) -> Result<Self> {
        let data = vm.data().lock().map_err(|e| anyhow!("{}", e))?;
        let named_tensors = data
            .iter()
            .map(|(k, v)| Ok((k.clone(), v.as_tensor().detach().copy()?)))
            .collect::<Result<_>>()?;
        Ok(Self { named_tensors })
    }

    /// Writes tensors into the variables of a [`VarMap`] with the same names.
    pub fn copy_to(&self, vm: &VarMap) -> Result<()> {
        let data = vm.data().lock().map_err(|e| anyhow!("{}", e))?;
        for (name, dest) in data.iter() {
            dest.set(self.get(name)?)?;
        }
        Ok(())
    }
}

impl From<&BTreeMap<String, Var>> for NamedTensors {
    fn from(vars: &BTreeMap<String, Var>) -> Self {
        Self {
            named_tensors: vars
                .iter()
                .map(|(k, v)| (k.clone(), v.as_tensor().clone()))
                .collect(),
        }
    }
}
