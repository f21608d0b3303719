//! Operator sugar over the composition builders.
//!
//! `a + b` composes sequentially, `a | b` takes the union, `a & b` the
//! intersection. Stages and pipelines mix freely on either side; chains
//! of the same operator flatten into a single node, so `a + b + c` is one
//! three-child sequential node, not a nested pair.

use super::Pipeline;
use crate::stage::{Mapper, RankerStage, RetrieverStage, Stage, TransformStage};
use std::ops::{Add, AddAssign, BitAnd, BitOr};

impl<R: Into<Pipeline>> Add<R> for Pipeline {
    type Output = Pipeline;

    fn add(self, rhs: R) -> Pipeline {
        Pipeline::sequential(vec![self, rhs.into()])
    }
}

impl<R: Into<Pipeline>> BitOr<R> for Pipeline {
    type Output = Pipeline;

    fn bitor(self, rhs: R) -> Pipeline {
        Pipeline::union_of(vec![self, rhs.into()])
    }
}

impl<R: Into<Pipeline>> BitAnd<R> for Pipeline {
    type Output = Pipeline;

    fn bitand(self, rhs: R) -> Pipeline {
        Pipeline::intersection_of(vec![self, rhs.into()])
    }
}

impl<R: Into<Pipeline>> AddAssign<R> for Pipeline {
    fn add_assign(&mut self, rhs: R) {
        let lhs = std::mem::replace(self, Pipeline::Sequential(Vec::new()));
        *self = lhs + rhs.into();
    }
}

impl From<Stage> for Pipeline {
    fn from(stage: Stage) -> Self {
        Pipeline::Stage(stage)
    }
}

/// Let stage values appear directly as operator operands by lifting them
/// into a leaf pipeline first.
macro_rules! impl_compose_ops {
    ($($stage:ty),+ $(,)?) => {
        $(
            impl From<$stage> for Pipeline {
                fn from(stage: $stage) -> Self {
                    Pipeline::Stage(Stage::from(stage))
                }
            }

            impl<R: Into<Pipeline>> Add<R> for $stage {
                type Output = Pipeline;

                fn add(self, rhs: R) -> Pipeline {
                    Pipeline::from(self) + rhs
                }
            }

            impl<R: Into<Pipeline>> BitOr<R> for $stage {
                type Output = Pipeline;

                fn bitor(self, rhs: R) -> Pipeline {
                    Pipeline::from(self) | rhs
                }
            }

            impl<R: Into<Pipeline>> BitAnd<R> for $stage {
                type Output = Pipeline;

                fn bitand(self, rhs: R) -> Pipeline {
                    Pipeline::from(self) & rhs
                }
            }
        )+
    };
}

impl_compose_ops!(RetrieverStage, RankerStage, Mapper, TransformStage);
