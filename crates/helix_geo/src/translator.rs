use crate::math::Real3;

/// Translation between a daughter universe's frame and its parent's.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Translator {
    translation: Real3,
}

impl Translator {
    pub fn new(translation: Real3) -> Self {
        Self { translation }
    }

    /// Daughter-frame point expressed in the parent frame.
    pub fn to_parent(&self, local: &Real3) -> Real3 {
        local + self.translation
    }

    /// Parent-frame point expressed in the daughter frame.
    pub fn to_local(&self, parent: &Real3) -> Real3 {
        parent - self.translation
    }
}
