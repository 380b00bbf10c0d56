fn main() {
    extshot_lib::run()
}
