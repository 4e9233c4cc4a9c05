//! Slot declaration macro.

/// Declare an adapter slot: a unit type owning one static
/// [`AdapterCell`](crate::slot::AdapterCell) for `$adapter`.
///
/// ```ignore
/// adapter_slot! {
///     /// Header-tracked PSRAM for the database engine.
///     pub DbHeap => HeaderTracked<ExtmemRegion>
/// }
///
/// let methods = install::<DbHeap>(Installation::new(adapter), &mut SqliteConfigurator)?;
/// ```
///
/// Each slot can be installed once per process. Tables for different slots
/// never share state.
#[macro_export]
macro_rules! adapter_slot {
    (
        $(#[$meta:meta])*
        $vis:vis $name:ident => $adapter:ty
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy)]
        $vis struct $name;

        impl $crate::slot::AdapterSlot for $name {
            type Adapter = $adapter;

            fn cell() -> &'static $crate::slot::AdapterCell<$adapter> {
                static CELL: $crate::slot::AdapterCell<$adapter> = $crate::slot::AdapterCell::new(
                    $crate::mem_methods::MemMethods::for_slot::<$name>(),
                );
                &CELL
            }
        }
    };
}
