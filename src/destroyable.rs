// Implemented by anything whose event subscriptions or scheduled callbacks hold it
// alive; `destroy` unsubscribes and cancels so the Rc cycle can be dropped.
pub trait Destroyable {
    fn destroy(&mut self);
}
