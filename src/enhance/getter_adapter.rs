//! Method adapter for property getters
//!
//! Wraps the visitor of a `getXXX` method. The original body is diverted into
//! a new `jdoGetXXX` method opened on the class, and once the original has
//! been fully visited a replacement `getXXX` body is generated that routes the
//! read through the state manager.

use log::debug;

use super::context::EnhanceContext;
use super::getter_body::GetterBody;
use crate::codegen::visitor::{Annotation, ClassVisitor, MethodVisitor};
use crate::common::consts::MSG_ADD_METHOD;
use crate::common::error::{Error, Result};
use crate::meta::FieldMeta;

pub struct PropertyGetterAdapter<'a, M, N> {
    /// Visitor of the original `getXXX` method
    mv: M,
    /// The new `jdoGetXXX` method receiving the original body
    relocated: N,
    ctx: &'a EnhanceContext,
    field: FieldMeta,
    relocated_name: String,
    body: GetterBody,
}

impl<'a, M, N> PropertyGetterAdapter<'a, M, N>
where
    M: MethodVisitor,
    N: MethodVisitor,
{
    /// Open the relocated method on `cv`.
    ///
    /// Fails for metadata no getter can be generated for, or when
    /// `method_descriptor` is not a no-argument accessor of the field's type.
    pub fn new<C>(
        mv: M,
        ctx: &'a EnhanceContext,
        method_name: &str,
        method_descriptor: &str,
        field: &FieldMeta,
        cv: &mut C,
    ) -> Result<Self>
    where
        C: ClassVisitor<Method = N>,
    {
        let body = GetterBody::prepare(field, &ctx.class, ctx.namer(), ctx.messages())?;
        if method_descriptor != field.getter_descriptor() {
            return Err(Error::metadata_error(format!(
                "{}{} is not a getter for property '{}' of type {}",
                method_name, method_descriptor, field.name, field.java_type
            )));
        }
        let relocated_name = body.relocated_name().to_string();
        let relocated = cv.visit_method(field.access_flags(), &relocated_name, method_descriptor, None, &[]);
        Ok(Self {
            mv,
            relocated,
            ctx,
            field: field.clone(),
            relocated_name,
            body,
        })
    }

    /// Give back the original and relocated visitors
    pub fn into_inner(self) -> (M, N) {
        (self.mv, self.relocated)
    }
}

impl<M, N> MethodVisitor for PropertyGetterAdapter<'_, M, N>
where
    M: MethodVisitor,
    N: MethodVisitor,
{
    fn delegate(&mut self) -> Option<&mut dyn MethodVisitor> {
        Some(&mut self.relocated)
    }

    /// Annotations stay on the method callers see
    fn visit_annotation(&mut self, annotation: &Annotation) {
        self.mv.visit_annotation(annotation);
    }

    fn visit_end(&mut self) {
        self.relocated.visit_end();
        if log::log_enabled!(log::Level::Debug) {
            let signature = format!("{} {}()", self.field.java_type, self.relocated_name);
            debug!("{}", self.ctx.messages().message(MSG_ADD_METHOD, &[&signature]));
        }

        if self.field.is_abstract {
            self.mv.visit_end();
        } else {
            self.body
                .emit(&mut self.mv, self.ctx.detach_listener(), self.ctx.include_frames());
        }
    }
}
