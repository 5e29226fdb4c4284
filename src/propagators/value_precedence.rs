use crate::basic_types::PropagationStatus;
use crate::engine::assignments::DomainId;
use crate::engine::propagation::DomainEvent;
use crate::engine::propagation::DomainEvents;
use crate::engine::propagation::EnqueueDecision;
use crate::engine::propagation::LocalId;
use crate::engine::propagation::PropagationContext;
use crate::engine::propagation::PropagationContextMut;
use crate::engine::propagation::Propagator;
use crate::engine::propagation::PropagatorInitialisationContext;
use crate::engine::trailed::TrailedInt;

/// Enforces that value `s` precedes value `t` across the assignment vector:
/// the first variable taking a value in `{s, t}` takes `s`. Maintains
/// generalized arc consistency (Law & Lee 2004, binary variant).
///
/// Posting this constraint on each pair of adjacent cluster values breaks the
/// value symmetry of the clustering model. Posting on all pairs filters
/// strictly more but does not pay off in practice, so the model posts
/// adjacent pairs only.
///
/// Three trailed pointers drive the filtering:
/// - `alpha`: smallest index whose domain still holds `s`; `t` is removed
///   from every earlier variable and from `x[alpha]` itself.
/// - `beta`: smallest index beyond `alpha` whose domain still holds `s`.
/// - `gamma`: smallest index fixed to `t` (or `n`).
///
/// Whenever `beta > gamma`, `x[alpha]` is the only variable that can supply
/// the `s` required before position `gamma`, so it is bound to `s`.
#[derive(Debug)]
pub(crate) struct ValuePrecedencePropagator {
    variables: Vec<DomainId>,
    s: usize,
    t: usize,
    alpha: TrailedInt,
    beta: TrailedInt,
    gamma: TrailedInt,
}

impl ValuePrecedencePropagator {
    pub(crate) fn new(variables: Vec<DomainId>, s: usize, t: usize) -> Self {
        debug_assert!(s != t);
        ValuePrecedencePropagator {
            variables,
            s,
            t,
            alpha: TrailedInt::default(),
            beta: TrailedInt::default(),
            gamma: TrailedInt::default(),
        }
    }
}

impl Propagator for ValuePrecedencePropagator {
    fn name(&self) -> &str {
        "ValuePrecedence"
    }

    fn initialise(&mut self, context: &mut PropagatorInitialisationContext<'_>) {
        let n = self.variables.len() as i64;
        self.alpha = context.new_trailed_int(0);
        self.beta = context.new_trailed_int(0);
        self.gamma = context.new_trailed_int(n);

        for (i, &variable) in self.variables.iter().enumerate() {
            context.register(variable, DomainEvents::ANY, LocalId::from(i as u32));
        }
    }

    fn propagate(&mut self, context: &mut PropagationContextMut<'_>) -> PropagationStatus {
        let n = self.variables.len();

        // Advance alpha over variables which can no longer take s, removing t
        // along the way; t is also removed from the new alpha position.
        let mut alpha = context.read_int(self.alpha) as usize;
        while alpha < n && !context.contains(self.variables[alpha], self.s) {
            context.remove(self.variables[alpha], self.t)?;
            alpha += 1;
        }
        context.assign_int(self.alpha, alpha as i64);

        if alpha == n {
            // s cannot appear at all; t was removed everywhere above.
            context.assign_int(self.beta, n as i64);
            return Ok(());
        }
        context.remove(self.variables[alpha], self.t)?;

        // Gamma: the first variable fixed to t.
        let mut gamma = n;
        for (i, &variable) in self.variables.iter().enumerate() {
            if context.is_fixed(variable) && context.value(variable) == self.t {
                gamma = i;
                break;
            }
        }
        context.assign_int(self.gamma, gamma as i64);

        // Beta: the next s-support after alpha.
        let mut beta = alpha + 1;
        while beta < n && !context.contains(self.variables[beta], self.s) {
            beta += 1;
        }
        context.assign_int(self.beta, beta as i64);

        if beta > gamma {
            context.fix(self.variables[alpha], self.s)?;
        }

        Ok(())
    }

    fn notify(
        &mut self,
        context: PropagationContext<'_>,
        local_id: LocalId,
        event: DomainEvent,
    ) -> EnqueueDecision {
        let index = local_id.unpack() as usize;
        let variable = self.variables[index];

        match event {
            // The pointers only move when a support for s disappears at alpha
            // or beta.
            DomainEvent::Removal => {
                let alpha = context.read_int(self.alpha) as usize;
                let beta = context.read_int(self.beta) as usize;
                if (index == alpha || index == beta) && !context.contains(variable, self.s) {
                    EnqueueDecision::Enqueue
                } else {
                    EnqueueDecision::Skip
                }
            }
            // A variable bound to t before gamma moves gamma forward.
            DomainEvent::Assign => {
                let gamma = context.read_int(self.gamma) as usize;
                if index < gamma && context.value(variable) == self.t {
                    EnqueueDecision::Enqueue
                } else {
                    EnqueueDecision::Skip
                }
            }
        }
    }
}
