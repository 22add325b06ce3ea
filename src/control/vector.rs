use crate::control::ControlSpace;
use crate::space::{FunctionView, FunctionViewMut};
use nalgebra::allocator::Allocator;
use nalgebra::{DVector, DefaultAllocator, DimName};
use std::fmt;
use std::fmt::{Display, Formatter};
use std::rc::Rc;

/// The vector operations an optimization algorithm needs from its iterates.
///
/// All binary operations require both vectors to belong to the same space.
pub trait OptimizationVector {
    /// `self <- self + v`.
    fn plus(&mut self, v: &Self);

    /// `self <- alpha * self`.
    fn scale(&mut self, alpha: f64);

    /// A new zero vector in the same space. Values are never copied.
    fn zeroed_clone(&self) -> Self;

    /// The inner product of `self` and `v`.
    fn dot(&self, v: &Self) -> f64;

    /// `self <- self + alpha * x`.
    fn axpy(&mut self, alpha: f64, x: &Self);

    /// `self <- v`.
    fn set(&mut self, v: &Self);

    fn dimension(&self) -> usize;
}

/// A point in a control space.
///
/// The vector owns one buffer of control parameters and shares its control space with all
/// other vectors created from it. For nodal control spaces, the buffer can be viewed as a
/// finite element function.
#[derive(Debug)]
pub struct ControlVector {
    space: Rc<dyn ControlSpace>,
    data: DVector<f64>,
}

impl ControlVector {
    /// Creates the zero vector of the given control space.
    pub fn new(space: Rc<dyn ControlSpace>) -> Self {
        let data = space.get_zero_vec();
        Self { space, data }
    }

    /// # Panics
    ///
    /// Panics if the length of the data does not match the dimension of the control space.
    pub fn from_data(space: Rc<dyn ControlSpace>, data: DVector<f64>) -> Self {
        assert_eq!(
            data.len(),
            space.dimension(),
            "Data length must match the dimension of the control space."
        );
        Self { space, data }
    }

    pub fn space(&self) -> &Rc<dyn ControlSpace> {
        &self.space
    }

    pub fn data(&self) -> &DVector<f64> {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut DVector<f64> {
        &mut self.data
    }

    /// Returns whether the vector belongs to the given control space instance.
    pub fn belongs_to<S: ?Sized>(&self, space: &S) -> bool {
        Rc::as_ptr(&self.space) as *const () == space as *const S as *const ()
    }

    pub fn same_space(&self, other: &ControlVector) -> bool {
        Rc::ptr_eq(&self.space, &other.space)
    }

    fn assert_same_space(&self, other: &ControlVector, operation: &str) {
        assert!(
            self.same_space(other),
            "Cannot {} control vectors from different control spaces.",
            operation
        );
    }

    /// Views the vector as a finite element function with `D` components per node.
    ///
    /// Returns `None` if the control space does not store finite element functions or if its
    /// geometric dimension differs from `D`.
    pub fn fe_view<D>(&self) -> Option<FunctionView<'_, f64, D>>
    where
        D: DimName,
        DefaultAllocator: Allocator<f64, D>,
    {
        self.has_fe_view::<D>()
            .then(|| FunctionView::from_slice(self.data.as_slice()))
    }

    pub fn fe_view_mut<D>(&mut self) -> Option<FunctionViewMut<'_, f64, D>>
    where
        D: DimName,
        DefaultAllocator: Allocator<f64, D>,
    {
        if self.has_fe_view::<D>() {
            Some(FunctionViewMut::from_slice(self.data.as_mut_slice()))
        } else {
            None
        }
    }

    fn has_fe_view<D: DimName>(&self) -> bool {
        self.space.nodal_view_size().is_some() && self.space.geometric_dim() == D::dim()
    }

    /// Computes the Riesz representative of this (dual) vector in the control space.
    pub fn riesz_map(&self) -> eyre::Result<ControlVector> {
        let mut out = self.zeroed_clone();
        self.space.riesz_map(self, &mut out)?;
        Ok(out)
    }
}

impl OptimizationVector for ControlVector {
    fn plus(&mut self, v: &Self) {
        self.assert_same_space(v, "add");
        self.data += &v.data;
    }

    fn scale(&mut self, alpha: f64) {
        self.data *= alpha;
    }

    fn zeroed_clone(&self) -> Self {
        Self::new(Rc::clone(&self.space))
    }

    fn dot(&self, v: &Self) -> f64 {
        self.assert_same_space(v, "take the inner product of");
        self.space
            .inner_product()
            .eval(self.data.as_view(), v.data.as_view())
    }

    fn axpy(&mut self, alpha: f64, x: &Self) {
        self.assert_same_space(x, "combine");
        self.data.axpy(alpha, &x.data, 1.0);
    }

    fn set(&mut self, v: &Self) {
        self.assert_same_space(v, "assign");
        self.data.copy_from(&v.data);
    }

    fn dimension(&self) -> usize {
        self.data.len()
    }
}

impl Display for ControlVector {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, value) in self.data.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}", value)?;
        }
        write!(f, "]")
    }
}
