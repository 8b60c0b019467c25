//! Conversion and construction matching.
//!
//! Decides whether a value of one type may become another, either by a
//! built-in conversion or by invoking user-defined conversion (`as`) or
//! construction (`sctor`/`lctor`) operators, returning ranked paths. The
//! exclude set guards recursive construction search against revisiting a
//! destination already in progress.

use std::collections::HashMap;

use lazy_static::lazy_static;

use crate::ast::ast::{Node, NodeId};
use crate::ast::decl::OperatorKind;
use crate::ast::types::{BasicType, TypeExpr};

use super::context::Resolver;

/// One step of a conversion path: its cost and, for user-defined steps,
/// the operator invoked.
#[derive(Debug, Clone)]
pub struct ConvertStep {
    pub cost: u32,
    pub operator: Option<NodeId>,
}

/// A ranked, possibly multi-step recipe for turning one type into another.
///
/// Cost 1 means identical (no work); a cost of 0 never appears in a
/// returned path, it is the "not possible" sentinel inside the cost table.
#[derive(Debug, Clone)]
pub struct ConvertPath {
    pub steps: Vec<ConvertStep>,
}

impl ConvertPath {
    pub fn single(cost: u32) -> Self {
        ConvertPath {
            steps: vec![ConvertStep {
                cost,
                operator: None,
            }],
        }
    }

    pub fn with_operator(cost: u32, operator: NodeId) -> Self {
        ConvertPath {
            steps: vec![ConvertStep {
                cost,
                operator: Some(operator),
            }],
        }
    }

    pub fn total_cost(&self) -> u32 {
        self.steps.iter().map(|step| step.cost).sum()
    }

    pub fn is_identical(&self) -> bool {
        self.total_cost() == 1
    }

    fn prefixed(mut self, step: ConvertStep) -> Self {
        self.steps.insert(0, step);
        self
    }
}

const BASICS: [BasicType; 11] = [
    BasicType::Bool,
    BasicType::Int8,
    BasicType::Int16,
    BasicType::Int32,
    BasicType::Int64,
    BasicType::UInt8,
    BasicType::UInt16,
    BasicType::UInt32,
    BasicType::UInt64,
    BasicType::Float32,
    BasicType::Float64,
];

fn basic_pair_cost(dst: BasicType, src: BasicType) -> u32 {
    if dst == src {
        return 1;
    }
    if dst == BasicType::Bool || src == BasicType::Bool {
        // Booleans only convert to themselves.
        return 0;
    }
    if dst.is_integer() && src.is_integer() {
        // Widening within one signedness is cheap; everything else narrows
        // or reinterprets.
        if dst.is_signed() == src.is_signed() && dst.width() > src.width() {
            return 2;
        }
        return 3;
    }
    if dst.is_float() && src.is_float() {
        if dst.width() > src.width() {
            return 2;
        }
        return 3;
    }
    if dst.is_float() && src.is_integer() {
        return 2;
    }
    if dst.is_integer() && src.is_float() {
        return 3;
    }
    0
}

lazy_static! {
    /// Fixed basic-type conversion cost table. Zero entries are omitted:
    /// absence means "not possible".
    static ref BASIC_COSTS: HashMap<(BasicType, BasicType), u32> = {
        let mut table = HashMap::new();
        for dst in BASICS {
            for src in BASICS {
                let cost = basic_pair_cost(dst, src);
                if cost > 0 {
                    table.insert((dst, src), cost);
                }
            }
        }
        table
    };
}

impl Resolver<'_> {
    /// Built-in conversions plus user-defined `as`-operator paths from a
    /// struct source. Returns every applicable path, unranked.
    pub fn convert(&mut self, dst: &TypeExpr, src: &TypeExpr) -> Vec<ConvertPath> {
        // An unknown destination accepts anything, before identity gets a
        // chance to call the pair identical.
        if matches!(dst, TypeExpr::Unknown) {
            return vec![ConvertPath::single(2)];
        }
        // Structural identity, lenient toward Unknown.
        if dst.is_identical(src, true) {
            return vec![ConvertPath::single(1)];
        }

        let mut paths = vec![];

        match (dst, src) {
            (TypeExpr::Basic(d), TypeExpr::Basic(s)) => {
                if let Some(cost) = BASIC_COSTS.get(&(*d, *s)) {
                    paths.push(ConvertPath::single(*cost));
                }
            }
            // A basic integer value fits a matching enum type.
            (TypeExpr::Enum(_), TypeExpr::Basic(s)) if s.is_integer() => {
                paths.push(ConvertPath::single(3));
            }
            // An enum decays to its underlying 32-bit signed integer.
            (TypeExpr::Basic(BasicType::Int32), TypeExpr::Enum(_)) => {
                paths.push(ConvertPath::single(2));
            }
            (_, TypeExpr::NullPointer) if dst.is_pointer() => {
                paths.push(ConvertPath::single(2));
            }
            (TypeExpr::NullPointer, TypeExpr::PointerConstrained(_)) => {
                paths.push(ConvertPath::single(2));
            }
            (TypeExpr::NullPointer, TypeExpr::PointerUnconstrained(_)) => {
                paths.push(ConvertPath::single(3));
            }
            (TypeExpr::PointerUnconstrained(_), TypeExpr::PointerConstrained(_))
            | (TypeExpr::PointerConstrained(_), TypeExpr::PointerUnconstrained(_)) => {
                paths.push(ConvertPath::single(3));
            }
            // A pointer exposes its 64-bit unsigned representation.
            (TypeExpr::Basic(BasicType::UInt64), TypeExpr::PointerConstrained(_))
            | (TypeExpr::Basic(BasicType::UInt64), TypeExpr::PointerUnconstrained(_)) => {
                paths.push(ConvertPath::single(2));
            }
            (_, TypeExpr::Struct(src_class)) => {
                paths.extend(self.convert_operators(*src_class, dst));
            }
            _ => {}
        }

        paths
    }

    /// One cost-4 path per `as`-operator of the source class whose return
    /// type identity-matches the destination.
    fn convert_operators(&mut self, src_class: NodeId, dst: &TypeExpr) -> Vec<ConvertPath> {
        let members = match self.ast.class(src_class) {
            Some(class) => class.members.clone(),
            None => return vec![],
        };

        let mut paths = vec![];
        for member in members {
            let Node::Operator(operator) = self.ast.node(member) else {
                continue;
            };
            if operator.kind != OperatorKind::Convert || operator.is_deleted {
                continue;
            }
            let Some(return_proto) = &operator.return_proto else {
                continue;
            };
            if return_proto.type_expr.is_identical(dst, false) {
                paths.push(ConvertPath::with_operator(4, member));
            }
        }
        paths
    }

    /// Construction search: for every construction operator of the struct
    /// destination, match its minimally-required parameter against the
    /// source with the destination excluded, prefixing a cost-5 segment.
    fn construct(
        &mut self,
        dst_class: NodeId,
        src: &TypeExpr,
        exclude: &mut Vec<NodeId>,
    ) -> Vec<ConvertPath> {
        let members = match self.ast.class(dst_class) {
            Some(class) => class.members.clone(),
            None => return vec![],
        };

        let mut paths = vec![];
        for member in members {
            let Node::Operator(operator) = self.ast.node(member) else {
                continue;
            };
            if !matches!(
                operator.kind,
                OperatorKind::StructCtor | OperatorKind::ListCtor
            ) || operator.is_deleted
                || operator.params.is_empty()
            {
                continue;
            }
            let params = operator.params.clone();
            let Some(required) = self.required_param(&params) else {
                continue;
            };
            let required_type = match self.ast.node(required) {
                Node::Param(param) => param.proto.type_expr.clone(),
                _ => continue,
            };

            exclude.push(dst_class);
            let sub_paths = self.match_types(&required_type, src, exclude);
            exclude.pop();

            for sub in sub_paths {
                paths.push(sub.prefixed(ConvertStep {
                    cost: 5,
                    operator: Some(member),
                }));
            }
        }
        paths
    }

    /// The minimally-required argument: the first parameter without a
    /// default value, or the sole parameter if there is exactly one.
    fn required_param(&self, params: &[NodeId]) -> Option<NodeId> {
        let without_default = params.iter().copied().find(|id| match self.ast.node(*id) {
            Node::Param(param) => !param.has_default,
            _ => false,
        });
        without_default.or(if params.len() == 1 {
            Some(params[0])
        } else {
            None
        })
    }

    /// Full matching: built-in conversions merged with constructor paths,
    /// sorted by ascending total cost (stable, so equal-cost paths keep
    /// discovery order). An identical path short-circuits construction.
    pub fn match_types(
        &mut self,
        dst: &TypeExpr,
        src: &TypeExpr,
        exclude: &mut Vec<NodeId>,
    ) -> Vec<ConvertPath> {
        if let TypeExpr::Struct(dst_class) = dst {
            if exclude.contains(dst_class) {
                return vec![];
            }
        }

        // Callables and entity value bundles have no defined conversions.
        if matches!(dst, TypeExpr::Callable(_) | TypeExpr::Entity(_))
            || matches!(src, TypeExpr::Callable(_) | TypeExpr::Entity(_))
        {
            return vec![];
        }

        let mut paths = self.convert(dst, src);
        if paths.iter().any(|path| path.is_identical()) {
            return paths;
        }

        if let TypeExpr::Struct(dst_class) = dst {
            let constructed = self.construct(*dst_class, src, exclude);
            paths.extend(constructed);
        }

        paths.sort_by_key(|path| path.total_cost());
        paths
    }
}
