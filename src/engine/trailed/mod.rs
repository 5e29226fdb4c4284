mod trailed_change;
mod trailed_values;

pub(crate) use trailed_change::TrailedChange;
pub(crate) use trailed_values::TrailedBool;
pub(crate) use trailed_values::TrailedFloat;
pub(crate) use trailed_values::TrailedInt;
pub(crate) use trailed_values::TrailedValues;
