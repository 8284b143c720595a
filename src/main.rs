fn main() {
    shelf_lib::run()
}
