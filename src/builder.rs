macro_rules! builder_set {
    ($attr_name: ident, Option<$attr_type: ty>) => {
        pub fn $attr_name(mut self, $attr_name: $attr_type) -> Self {
            self.$attr_name = Some($attr_name);
            self
        }
    };
    ($attr_name: ident, $attr_type: ty) => {
        pub fn $attr_name(mut self, $attr_name: $attr_type) -> Self {
            self.$attr_name = $attr_name;
            self
        }
    };
}
